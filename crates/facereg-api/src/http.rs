//! [`FaceApi`] over HTTP via reqwest.

use crate::client::{FaceApi, ListQuery, RecognizeBody, RecognizeForm, RegisterBody, RegisterForm};
use crate::config::Config;
use async_trait::async_trait;
use base64::Engine as _;
use facereg_core::envelope::{decode, decode_ack};
use facereg_core::{ApiError, FaceRecord, ImageUpload, RecognitionMatch};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the face service. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct HttpFaceApi {
    client: Client,
    config: Config,
}

impl HttpFaceApi {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        tracing::debug!(base_url = %config.api.base_url, "http client ready");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `base_url + prefix + "/" + segment`, with the segment percent-encoded.
    fn segment_url(&self, prefix: &str, segment: &str) -> Result<Url, ApiError> {
        if segment.trim().is_empty() {
            return Err(ApiError::InvalidInput("id must not be empty".into()));
        }
        let mut url = self.endpoint_url(prefix)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidInput("base url cannot take a path".into()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let raw = self.config.url(endpoint);
        Url::parse(&raw).map_err(|e| ApiError::InvalidInput(format!("bad url {raw}: {e}")))
    }

    /// Send, read the body, and unwrap the envelope. HTTP status is not
    /// consulted; the envelope code decides.
    async fn call<T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let body = self.send(op, request).await?;
        let result = decode::<T>(&body);
        log_outcome(op, &result);
        result
    }

    async fn call_ack(&self, op: &'static str, request: RequestBuilder) -> Result<(), ApiError> {
        let body = self.send(op, request).await?;
        let result = decode_ack(&body);
        log_outcome(op, &result);
        result
    }

    async fn send(&self, op: &'static str, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(op, error = %e, "request failed");
            ApiError::Transport(e.to_string())
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(op, %status, error = %e, "reading response failed");
            ApiError::Transport(e.to_string())
        })?;
        tracing::debug!(op, %status, len = body.len(), "response received");
        Ok(body.to_vec())
    }
}

fn log_outcome<T>(op: &'static str, result: &Result<T, ApiError>) {
    match result {
        Ok(_) => {}
        Err(ApiError::Rejected { code, message }) => {
            tracing::warn!(op, code, message = %message, "service rejected request");
        }
        Err(e) => tracing::error!(op, error = %e, "bad response"),
    }
}

fn file_part(image: &ImageUpload) -> Result<Part, ApiError> {
    Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.mime)
        .map_err(|e| ApiError::InvalidInput(format!("bad mime type {}: {e}", image.mime)))
}

fn to_base64(image: &ImageUpload) -> String {
    base64::engine::general_purpose::STANDARD.encode(&image.bytes)
}

#[async_trait]
impl FaceApi for HttpFaceApi {
    async fn check_health(&self) -> bool {
        let url = self.config.url(&self.config.endpoints.health);
        match self
            .call::<serde_json::Value>("health", self.client.get(url))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }

    async fn register_face(&self, form: &RegisterForm) -> Result<String, ApiError> {
        form.validate()?;
        let mut multipart = Form::new()
            .part("file", file_part(&form.image)?)
            .text("name", form.name.clone())
            .text("personId", form.person_id.clone());
        if let Some(remark) = form.remark() {
            multipart = multipart.text("remark", remark.to_string());
        }
        tracing::info!(name = %form.name, person_id = %form.person_id, file = %form.image.file_name, "registering face");

        let url = self.config.url(&self.config.endpoints.register);
        let face_id = self
            .call::<String>("register", self.client.post(url).multipart(multipart))
            .await?
            .ok_or_else(|| ApiError::Decode("response has no face id".into()))?;
        tracing::info!(face_id = %face_id, "face registered");
        Ok(face_id)
    }

    async fn register_face_base64(&self, form: &RegisterForm) -> Result<String, ApiError> {
        form.validate()?;
        let body = RegisterBody {
            name: &form.name,
            person_id: &form.person_id,
            image_base64: to_base64(&form.image),
            remark: form.remark(),
        };
        tracing::info!(name = %form.name, person_id = %form.person_id, "registering face (base64)");

        let url = self.config.url(&self.config.endpoints.register_base64);
        let face_id = self
            .call::<String>("register_base64", self.client.post(url).json(&body))
            .await?
            .ok_or_else(|| ApiError::Decode("response has no face id".into()))?;
        tracing::info!(face_id = %face_id, "face registered");
        Ok(face_id)
    }

    async fn recognize_face(
        &self,
        form: &RecognizeForm,
    ) -> Result<Vec<RecognitionMatch>, ApiError> {
        let multipart = Form::new()
            .part("file", file_part(&form.image)?)
            .text("threshold", form.threshold.to_string())
            .text("topK", form.top_k.to_string());
        tracing::info!(threshold = form.threshold, top_k = form.top_k, "recognizing face");

        let url = self.config.url(&self.config.endpoints.recognize);
        let matches = self
            .call::<Vec<RecognitionMatch>>("recognize", self.client.post(url).multipart(multipart))
            .await?
            .unwrap_or_default();
        tracing::info!(count = matches.len(), "recognition finished");
        Ok(matches)
    }

    async fn recognize_face_base64(
        &self,
        form: &RecognizeForm,
    ) -> Result<Vec<RecognitionMatch>, ApiError> {
        let body = RecognizeBody {
            image_base64: to_base64(&form.image),
            threshold: form.threshold,
            top_k: form.top_k,
        };
        let url = self.config.url(&self.config.endpoints.recognize_base64);
        let matches = self
            .call::<Vec<RecognitionMatch>>("recognize_base64", self.client.post(url).json(&body))
            .await?
            .unwrap_or_default();
        tracing::info!(count = matches.len(), "recognition finished");
        Ok(matches)
    }

    async fn delete_face(&self, face_id: &str) -> Result<(), ApiError> {
        let url = self.segment_url(&self.config.endpoints.delete_face, face_id)?;
        self.call_ack("delete_face", self.client.delete(url)).await?;
        tracing::info!(face_id, "face deleted");
        Ok(())
    }

    async fn delete_person_faces(&self, person_id: &str) -> Result<(), ApiError> {
        let url = self.segment_url(&self.config.endpoints.delete_person, person_id)?;
        self.call_ack("delete_person", self.client.delete(url)).await?;
        tracing::info!(person_id, "person faces deleted");
        Ok(())
    }

    async fn list_faces(&self, query: &ListQuery) -> Result<Vec<FaceRecord>, ApiError> {
        let url = self.config.url(&self.config.endpoints.list);
        let request = self.client.get(url).query(&query.params());
        let faces = self
            .call::<Vec<FaceRecord>>("list", request)
            .await?
            .unwrap_or_default();
        tracing::debug!(
            person_id = ?query.person_id,
            name = ?query.name,
            count = faces.len(),
            "faces listed"
        );
        Ok(faces)
    }

    async fn query_by_person_id(&self, person_id: &str) -> Result<Vec<FaceRecord>, ApiError> {
        let url = self.segment_url(&self.config.endpoints.query_by_person, person_id)?;
        Ok(self
            .call::<Vec<FaceRecord>>("query_by_person", self.client.get(url))
            .await?
            .unwrap_or_default())
    }

    async fn reset_database(&self) -> Result<(), ApiError> {
        let url = self.config.url(&self.config.endpoints.reset);
        self.call_ack("reset", self.client.post(url)).await?;
        tracing::warn!("face database reset");
        Ok(())
    }

    async fn debug_detect(&self, image: &ImageUpload) -> Result<String, ApiError> {
        let multipart = Form::new().part("file", file_part(image)?);
        let url = self.config.url(&self.config.endpoints.debug_detect);
        Ok(self
            .call::<String>("debug_detect", self.client.post(url).multipart(multipart))
            .await?
            .unwrap_or_default())
    }
}
