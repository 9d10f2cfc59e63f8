//! Image selection and validation for the register and recognize forms.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// 10 MiB, matching the service's own multipart limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadRejection {
    #[error("only JPG and PNG images are supported (got {0})")]
    UnsupportedType(String),
    #[error("image must not exceed {limit_mb} MB ({size} bytes)")]
    TooLarge { size: u64, limit_mb: u64 },
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Accepted MIME types and the size ceiling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadLimits {
    pub max_size: u64,
    pub accepted_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
            ],
        }
    }
}

impl UploadLimits {
    /// Type is checked before size, so a file failing both reports its type.
    pub fn validate(&self, mime: &str, size: u64) -> Result<(), UploadRejection> {
        if !self.accepted_types.iter().any(|t| t == mime) {
            return Err(UploadRejection::UnsupportedType(mime.to_string()));
        }
        if size > self.max_size {
            return Err(UploadRejection::TooLarge {
                size,
                limit_mb: self.max_size / (1024 * 1024),
            });
        }
        Ok(())
    }
}

/// An image file read into memory, ready to be sent as a multipart part.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    /// Read a file and validate it against `limits`.
    ///
    /// Size is checked from metadata before the file is read so oversized
    /// files are never loaded.
    pub fn open(path: &Path, limits: &UploadLimits) -> Result<Self, UploadRejection> {
        let unreadable = |e: std::io::Error| UploadRejection::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let size = std::fs::metadata(path).map_err(unreadable)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        // Reject by extension first; sniffing needs the bytes.
        if size > limits.max_size {
            let mime = mime_from_extension(path).unwrap_or("application/octet-stream");
            limits.validate(mime, size)?;
        }

        let bytes = std::fs::read(path).map_err(unreadable)?;
        let mime = sniff_mime(&bytes, path);
        limits.validate(&mime, bytes.len() as u64)?;

        tracing::debug!(file = %file_name, mime = %mime, size = bytes.len(), "image selected");

        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Pixel dimensions, if the image header can be decoded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(std::io::Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    /// One-line preview for the terminal.
    pub fn preview(&self) -> String {
        let kb = self.size() as f64 / 1024.0;
        match self.dimensions() {
            Some((w, h)) => format!("{} ({}x{}, {:.1} KB)", self.file_name, w, h, kb),
            None => format!("{} ({:.1} KB)", self.file_name, kb),
        }
    }
}

/// Magic bytes first, extension as fallback.
fn sniff_mime(bytes: &[u8], path: &Path) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    mime_from_extension(path)
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // PNG signature; enough for format detection.
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_rejects_unaccepted_types() {
        let limits = UploadLimits::default();
        for mime in ["image/gif", "image/webp", "application/pdf", "text/plain", ""] {
            assert_eq!(
                limits.validate(mime, 1024),
                Err(UploadRejection::UnsupportedType(mime.to_string()))
            );
        }
    }

    #[test]
    fn test_accepts_jpeg_jpg_png() {
        let limits = UploadLimits::default();
        for mime in ["image/jpeg", "image/jpg", "image/png"] {
            assert!(limits.validate(mime, 1024).is_ok());
        }
    }

    #[test]
    fn test_rejects_oversized_regardless_of_type() {
        let limits = UploadLimits::default();
        let size = DEFAULT_MAX_UPLOAD_BYTES + 1;
        assert!(matches!(
            limits.validate("image/png", size),
            Err(UploadRejection::TooLarge { limit_mb: 10, .. })
        ));
        assert!(limits.validate("image/gif", size).is_err());
    }

    #[test]
    fn test_exact_limit_is_accepted() {
        let limits = UploadLimits::default();
        assert!(limits.validate("image/jpeg", DEFAULT_MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_open_sniffs_content() {
        let dir = tempfile::tempdir().unwrap();
        // Misleading extension; content is PNG.
        let path = dir.path().join("face.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(PNG_MAGIC).unwrap();
        f.write_all(&[0u8; 32]).unwrap();

        let upload = ImageUpload::open(&path, &UploadLimits::default()).unwrap();
        assert_eq!(upload.mime, "image/png");
        assert_eq!(upload.file_name, "face.txt");
    }

    #[test]
    fn test_open_rejects_unknown_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = ImageUpload::open(&path, &UploadLimits::default()).unwrap_err();
        assert!(matches!(err, UploadRejection::UnsupportedType(_)));
    }

    #[test]
    fn test_open_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();
        let limits = UploadLimits {
            max_size: 4,
            ..UploadLimits::default()
        };

        let err = ImageUpload::open(&path, &limits).unwrap_err();
        assert!(matches!(err, UploadRejection::TooLarge { size: 8, .. }));
    }

    #[test]
    fn test_open_missing_file() {
        let err = ImageUpload::open(Path::new("/nonexistent/face.png"), &UploadLimits::default())
            .unwrap_err();
        assert!(matches!(err, UploadRejection::Unreadable { .. }));
    }
}
