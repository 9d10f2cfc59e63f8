//! One-shot subcommands.

use crate::search::two_pass_search;
use crate::view::{face_row, match_row, EMPTY_LIST_MESSAGE, NO_MATCH_MESSAGE};
use anyhow::{bail, Context, Result};
use facereg_api::{ApiError, Config, FaceApi, ListQuery, RecognizeForm, RegisterForm};
use facereg_core::{FaceRecord, ImageUpload};
use std::io::Write;
use std::path::Path;

fn failed(err: ApiError, fallback: &str) -> anyhow::Error {
    tracing::debug!(error = ?err, "request failed");
    anyhow::anyhow!(err.user_message(fallback))
}

fn open_image(path: &Path, config: &Config) -> Result<ImageUpload> {
    let image = ImageUpload::open(path, &config.upload)
        .with_context(|| format!("cannot use {}", path.display()))?;
    tracing::debug!(image = %image.preview(), "image loaded");
    Ok(image)
}

fn print_faces(out: &mut impl Write, faces: &[FaceRecord]) -> Result<()> {
    writeln!(out, "faces: {}", faces.len())?;
    if faces.is_empty() {
        writeln!(out, "  {EMPTY_LIST_MESSAGE}")?;
    }
    for face in faces {
        writeln!(out, "  {}  {}", face.face_id, face_row(face))?;
    }
    Ok(())
}

pub async fn health(api: &dyn FaceApi, out: &mut impl Write) -> Result<()> {
    if api.check_health().await {
        writeln!(out, "service online")?;
        Ok(())
    } else {
        bail!("service offline")
    }
}

pub struct RegisterArgs<'a> {
    pub image: &'a Path,
    pub name: String,
    pub person_id: String,
    pub remark: Option<String>,
    pub base64: bool,
}

pub async fn register(
    api: &dyn FaceApi,
    config: &Config,
    args: RegisterArgs<'_>,
    out: &mut impl Write,
) -> Result<()> {
    let form = RegisterForm {
        image: open_image(args.image, config)?,
        name: args.name.trim().to_string(),
        person_id: args.person_id.trim().to_string(),
        remark: args.remark,
    };
    let result = if args.base64 {
        api.register_face_base64(&form).await
    } else {
        api.register_face(&form).await
    };
    let face_id = result.map_err(|e| failed(e, "registration failed"))?;
    writeln!(out, "registered face {face_id}")?;
    Ok(())
}

pub struct RecognizeArgs<'a> {
    pub image: &'a Path,
    pub threshold: Option<f32>,
    pub top_k: Option<u32>,
    pub base64: bool,
}

pub async fn recognize(
    api: &dyn FaceApi,
    config: &Config,
    args: RecognizeArgs<'_>,
    out: &mut impl Write,
) -> Result<()> {
    let threshold = args.threshold.unwrap_or(config.defaults.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        bail!("threshold must be between 0 and 1, got {threshold}");
    }
    let top_k = args.top_k.unwrap_or(config.defaults.top_k);
    if top_k == 0 {
        bail!("top k must be at least 1");
    }

    let form = RecognizeForm {
        image: open_image(args.image, config)?,
        threshold,
        top_k,
    };
    let result = if args.base64 {
        api.recognize_face_base64(&form).await
    } else {
        api.recognize_face(&form).await
    };
    let matches = result.map_err(|e| failed(e, "recognition failed"))?;

    if matches.is_empty() {
        writeln!(out, "{NO_MATCH_MESSAGE}")?;
    }
    for m in &matches {
        writeln!(out, "{}", match_row(m))?;
    }
    Ok(())
}

pub async fn delete_face(api: &dyn FaceApi, face_id: &str, out: &mut impl Write) -> Result<()> {
    api.delete_face(face_id)
        .await
        .map_err(|e| failed(e, "delete failed"))?;
    writeln!(out, "deleted face {face_id}")?;
    Ok(())
}

pub async fn delete_person(
    api: &dyn FaceApi,
    person_id: &str,
    out: &mut impl Write,
) -> Result<()> {
    api.delete_person_faces(person_id)
        .await
        .map_err(|e| failed(e, "delete failed"))?;
    writeln!(out, "deleted every face of person {person_id}")?;
    Ok(())
}

pub async fn list(api: &dyn FaceApi, query: ListQuery, out: &mut impl Write) -> Result<()> {
    let faces = api
        .list_faces(&query)
        .await
        .map_err(|e| failed(e, "failed to load face list"))?;
    print_faces(out, &faces)
}

pub async fn query(api: &dyn FaceApi, person_id: &str, out: &mut impl Write) -> Result<()> {
    let faces = api
        .query_by_person_id(person_id)
        .await
        .map_err(|e| failed(e, "query failed"))?;
    print_faces(out, &faces)
}

pub async fn search(
    api: &dyn FaceApi,
    keyword: &str,
    limit: u32,
    out: &mut impl Write,
) -> Result<()> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        bail!("search keyword is empty");
    }
    let faces = two_pass_search(api, keyword, limit)
        .await
        .map_err(|e| failed(e, "search failed"))?;
    if faces.is_empty() {
        writeln!(out, "{NO_MATCH_MESSAGE}")?;
        return Ok(());
    }
    print_faces(out, &faces)
}

pub const RESET_PROMPT: &str =
    "WARNING: this deletes all face data and cannot be undone. continue?";

/// Yes/no question on the terminal, defaulting to no.
pub fn confirm_on_terminal(prompt: &str) -> Result<bool> {
    let answer = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("reading confirmation")?;
    Ok(answer)
}

/// Wipe the database. Without `yes`, `confirm` is asked first.
pub async fn reset(
    api: &dyn FaceApi,
    yes: bool,
    confirm: impl FnOnce(&str) -> Result<bool>,
    out: &mut impl Write,
) -> Result<()> {
    if !yes && !confirm(RESET_PROMPT)? {
        writeln!(out, "cancelled")?;
        return Ok(());
    }
    api.reset_database()
        .await
        .map_err(|e| failed(e, "reset failed"))?;
    writeln!(out, "database reset")?;
    Ok(())
}

pub async fn detect(
    api: &dyn FaceApi,
    config: &Config,
    image: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let image = open_image(image, config)?;
    let message = api
        .debug_detect(&image)
        .await
        .map_err(|e| failed(e, "detection failed"))?;
    writeln!(out, "{message}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{face, Call, MockApi};

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn write_png(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("face.png");
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0; 32]);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_health_offline_is_an_error() {
        let api = MockApi::with_faces(Vec::new());
        api.set_healthy(false);
        let mut out = Vec::new();
        assert!(health(&api, &mut out).await.is_err());
    }

    #[tokio::test]
    async fn test_register_prints_face_id() {
        let dir = tempfile::tempdir().unwrap();
        let api = MockApi::with_faces(Vec::new());
        let mut out = Vec::new();
        let args = RegisterArgs {
            image: &write_png(&dir),
            name: " Ann ".into(),
            person_id: "p1".into(),
            remark: None,
            base64: false,
        };
        register(&api, &Config::default(), args, &mut out)
            .await
            .unwrap();
        assert_eq!(output(out), "registered face face-1\n");
        assert!(api.calls().contains(&Call::Register {
            name: "Ann".into(),
            person_id: "p1".into(),
        }));
    }

    #[tokio::test]
    async fn test_recognize_rejects_bad_threshold_before_upload() {
        let api = MockApi::with_faces(Vec::new());
        let args = RecognizeArgs {
            image: Path::new("/nonexistent.png"),
            threshold: Some(1.5),
            top_k: None,
            base64: false,
        };
        let err = recognize(&api, &Config::default(), args, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("threshold"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_server_message_surfaces() {
        let api = MockApi::with_faces(Vec::new());
        api.fail_next(
            "delete_face",
            ApiError::Rejected {
                code: 404,
                message: "face not found".into(),
            },
        );
        let err = delete_face(&api, "f9", &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "face not found");
    }

    #[tokio::test]
    async fn test_list_empty() {
        let api = MockApi::with_faces(Vec::new());
        let mut out = Vec::new();
        list(&api, ListQuery::all(100), &mut out).await.unwrap();
        let out = output(out);
        assert!(out.contains("faces: 0"));
        assert!(out.contains(EMPTY_LIST_MESSAGE));
    }

    #[tokio::test]
    async fn test_search_prints_name_hits() {
        let api = MockApi::with_faces(vec![face("f1", "p1", "Ann"), face("f2", "p2", "Bob")]);
        let mut out = Vec::new();
        search(&api, "Bob", 100, &mut out).await.unwrap();
        let out = output(out);
        assert!(out.contains("faces: 1"));
        assert!(out.contains("f2"));
    }

    #[tokio::test]
    async fn test_reset_declined() {
        let api = MockApi::with_faces(vec![face("f1", "p1", "Ann")]);
        let mut out = Vec::new();
        let mut asked = None;
        let declined = |prompt: &str| {
            asked = Some(prompt.to_string());
            Ok(false)
        };
        reset(&api, false, declined, &mut out).await.unwrap();
        assert_eq!(output(out), "cancelled\n");
        assert_eq!(asked.as_deref(), Some(RESET_PROMPT));
        assert!(!api.calls().contains(&Call::Reset));
    }

    #[tokio::test]
    async fn test_reset_with_yes_skips_prompt() {
        let api = MockApi::with_faces(vec![face("f1", "p1", "Ann")]);
        let mut out = Vec::new();
        let never = |_: &str| -> Result<bool> { panic!("--yes must not prompt") };
        reset(&api, true, never, &mut out).await.unwrap();
        assert_eq!(output(out), "database reset\n");
        assert!(api.calls().contains(&Call::Reset));
    }

    #[tokio::test]
    async fn test_reset_confirmed() {
        let api = MockApi::with_faces(vec![face("f1", "p1", "Ann")]);
        let mut out = Vec::new();
        reset(&api, false, |_: &str| Ok(true), &mut out).await.unwrap();
        assert_eq!(output(out), "database reset\n");
        assert!(api.calls().contains(&Call::Reset));
    }

    #[tokio::test]
    async fn test_detect_reports_message() {
        let dir = tempfile::tempdir().unwrap();
        let api = MockApi::with_faces(Vec::new());
        let mut out = Vec::new();
        detect(&api, &Config::default(), &write_png(&dir), &mut out)
            .await
            .unwrap();
        assert!(output(out).contains("1 face found"));
    }
}
