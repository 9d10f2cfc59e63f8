//! facereg-core — Data model for the face registration client.
//!
//! Face records and recognition matches as the service reports them, the
//! response envelope and its tagged error, and upload validation for the
//! register and recognize forms.

pub mod envelope;
pub mod format;
pub mod types;
pub mod upload;

pub use envelope::ApiError;
pub use types::{FaceRecord, RecognitionMatch, SimilarityLevel};
pub use upload::{ImageUpload, UploadLimits, UploadRejection};
