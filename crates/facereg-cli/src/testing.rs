//! In-memory [`FaceApi`] for controller and search tests.

use async_trait::async_trait;
use facereg_api::{ApiError, FaceApi, ListQuery, RecognizeForm, RegisterForm};
use facereg_core::{FaceRecord, ImageUpload, RecognitionMatch};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Health,
    Register { name: String, person_id: String },
    Recognize { threshold: f32, top_k: u32 },
    DeleteFace(String),
    DeletePerson(String),
    List(ListQuery),
    QueryByPerson(String),
    Reset,
    DebugDetect,
}

pub fn face(face_id: &str, person_id: &str, name: &str) -> FaceRecord {
    FaceRecord {
        face_id: face_id.into(),
        person_id: Some(person_id.into()),
        name: Some(name.into()),
        remark: None,
        create_time: Some(1_700_000_000_000),
    }
}

pub fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.into(),
        mime: "image/png".into(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

/// Behaves like the service with exact-match filters; every call is recorded.
pub struct MockApi {
    faces: Mutex<Vec<FaceRecord>>,
    matches: Mutex<Vec<RecognitionMatch>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    healthy: AtomicBool,
}

impl MockApi {
    pub fn with_faces(faces: Vec<FaceRecord>) -> Self {
        Self {
            faces: Mutex::new(faces),
            matches: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn set_matches(&self, matches: Vec<RecognitionMatch>) {
        *self.matches.lock().unwrap() = matches;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<ListQuery> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::List(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> Result<(), ApiError> {
        match self.failures.lock().unwrap().remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FaceApi for MockApi {
    async fn check_health(&self) -> bool {
        self.record(Call::Health);
        self.healthy.load(Ordering::SeqCst)
    }

    async fn register_face(&self, form: &RegisterForm) -> Result<String, ApiError> {
        self.record(Call::Register {
            name: form.name.clone(),
            person_id: form.person_id.clone(),
        });
        self.check("register")?;
        let mut faces = self.faces.lock().unwrap();
        let face_id = format!("face-{}", faces.len() + 1);
        faces.push(FaceRecord {
            face_id: face_id.clone(),
            person_id: Some(form.person_id.clone()),
            name: Some(form.name.clone()),
            remark: form.remark.clone(),
            create_time: None,
        });
        Ok(face_id)
    }

    async fn register_face_base64(&self, form: &RegisterForm) -> Result<String, ApiError> {
        self.register_face(form).await
    }

    async fn recognize_face(
        &self,
        form: &RecognizeForm,
    ) -> Result<Vec<RecognitionMatch>, ApiError> {
        self.record(Call::Recognize {
            threshold: form.threshold,
            top_k: form.top_k,
        });
        self.check("recognize")?;
        Ok(self.matches.lock().unwrap().clone())
    }

    async fn recognize_face_base64(
        &self,
        form: &RecognizeForm,
    ) -> Result<Vec<RecognitionMatch>, ApiError> {
        self.recognize_face(form).await
    }

    async fn delete_face(&self, face_id: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteFace(face_id.to_string()));
        self.check("delete_face")?;
        self.faces.lock().unwrap().retain(|f| f.face_id != face_id);
        Ok(())
    }

    async fn delete_person_faces(&self, person_id: &str) -> Result<(), ApiError> {
        self.record(Call::DeletePerson(person_id.to_string()));
        self.check("delete_person")?;
        self.faces
            .lock()
            .unwrap()
            .retain(|f| f.person_id.as_deref() != Some(person_id));
        Ok(())
    }

    async fn list_faces(&self, query: &ListQuery) -> Result<Vec<FaceRecord>, ApiError> {
        self.record(Call::List(query.clone()));
        self.check("list")?;
        let faces = self.faces.lock().unwrap();
        let person_id = query.person_id.as_deref().filter(|s| !s.is_empty());
        let name = query.name.as_deref().filter(|s| !s.is_empty());
        Ok(faces
            .iter()
            .filter(|f| match (person_id, name) {
                (Some(id), _) => f.person_id.as_deref() == Some(id),
                (None, Some(n)) => f.name.as_deref() == Some(n),
                (None, None) => true,
            })
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn query_by_person_id(&self, person_id: &str) -> Result<Vec<FaceRecord>, ApiError> {
        self.record(Call::QueryByPerson(person_id.to_string()));
        self.check("query_by_person")?;
        Ok(self
            .faces
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.person_id.as_deref() == Some(person_id))
            .cloned()
            .collect())
    }

    async fn reset_database(&self) -> Result<(), ApiError> {
        self.record(Call::Reset);
        self.check("reset")?;
        self.faces.lock().unwrap().clear();
        Ok(())
    }

    async fn debug_detect(&self, _image: &ImageUpload) -> Result<String, ApiError> {
        self.record(Call::DebugDetect);
        self.check("debug_detect")?;
        Ok("detection finished, 1 face found".into())
    }
}
