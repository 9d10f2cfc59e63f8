//! The operations the face service offers, as a trait the UI depends on.

use async_trait::async_trait;
use facereg_core::{ApiError, FaceRecord, ImageUpload, RecognitionMatch};
use serde::Serialize;

/// Fields of the register form.
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub image: ImageUpload,
    pub name: String,
    pub person_id: String,
    pub remark: Option<String>,
}

impl RegisterForm {
    /// The service requires a name and a person id.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("name must not be empty".into()));
        }
        if self.person_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("person id must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn remark(&self) -> Option<&str> {
        self.remark.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// Fields of the recognize form.
#[derive(Debug, Clone)]
pub struct RecognizeForm {
    pub image: ImageUpload,
    /// Minimum similarity, in [0, 1].
    pub threshold: f32,
    pub top_k: u32,
}

/// Filters for the listing endpoint. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub person_id: Option<String>,
    pub name: Option<String>,
    pub limit: u32,
}

impl ListQuery {
    pub fn all(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn by_person_id(person_id: impl Into<String>, limit: u32) -> Self {
        Self {
            person_id: Some(person_id.into()),
            limit,
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>, limit: u32) -> Self {
        Self {
            name: Some(name.into()),
            limit,
            ..Self::default()
        }
    }

    /// Query-string pairs in the order the service documents them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(id) = self.person_id.as_deref().filter(|s| !s.is_empty()) {
            params.push(("personId", id.to_string()));
        }
        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            params.push(("name", name.to_string()));
        }
        params
    }
}

/// JSON body for the base64 register endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterBody<'a> {
    pub name: &'a str,
    pub person_id: &'a str,
    pub image_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<&'a str>,
}

/// JSON body for the base64 recognize endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognizeBody {
    pub image_base64: String,
    pub threshold: f32,
    pub top_k: u32,
}

/// Face service operations.
///
/// Implementations never panic on service or transport failure; every
/// failure comes back as an [`ApiError`].
#[async_trait]
pub trait FaceApi: Send + Sync {
    /// True iff the service answers with code 200.
    async fn check_health(&self) -> bool;

    /// Upload an image as multipart and enroll it. Returns the new face id.
    async fn register_face(&self, form: &RegisterForm) -> Result<String, ApiError>;

    /// Enroll via the JSON endpoint with the image inlined as base64.
    async fn register_face_base64(&self, form: &RegisterForm) -> Result<String, ApiError>;

    /// Candidates in the order the service ranked them. May be empty.
    async fn recognize_face(&self, form: &RecognizeForm)
        -> Result<Vec<RecognitionMatch>, ApiError>;

    async fn recognize_face_base64(
        &self,
        form: &RecognizeForm,
    ) -> Result<Vec<RecognitionMatch>, ApiError>;

    async fn delete_face(&self, face_id: &str) -> Result<(), ApiError>;

    /// Delete every face enrolled under `person_id`.
    async fn delete_person_faces(&self, person_id: &str) -> Result<(), ApiError>;

    async fn list_faces(&self, query: &ListQuery) -> Result<Vec<FaceRecord>, ApiError>;

    async fn query_by_person_id(&self, person_id: &str) -> Result<Vec<FaceRecord>, ApiError>;

    /// Drop all enrolled faces. Irreversible.
    async fn reset_database(&self) -> Result<(), ApiError>;

    /// Run detection only and return the service's diagnostic message.
    async fn debug_detect(&self, image: &ImageUpload) -> Result<String, ApiError>;
}
