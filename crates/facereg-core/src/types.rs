use serde::{Deserialize, Serialize};

/// One enrolled face as returned by the listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    pub face_id: String,
    #[serde(default)]
    pub person_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    /// Registration time in epoch milliseconds. The service reports it as
    /// `registerTime`; older payloads use `createTime`.
    #[serde(default, alias = "registerTime")]
    pub create_time: Option<i64>,
}

impl FaceRecord {
    /// Display name, `unknown` when the service returned none.
    pub fn display_name(&self) -> &str {
        shown_name(self.name.as_deref())
    }

    /// Display person id, `N/A` when the service returned none.
    pub fn display_person_id(&self) -> &str {
        shown_person_id(self.person_id.as_deref())
    }

    /// Remark worth showing. The service stores a missing remark as the
    /// literal string `"null"`.
    pub fn display_remark(&self) -> Option<&str> {
        visible_remark(self.remark.as_deref())
    }
}

/// One candidate returned by a recognition call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionMatch {
    #[serde(default)]
    pub face_id: Option<String>,
    #[serde(default)]
    pub person_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    /// Backend confidence in [0, 1].
    pub similarity: f32,
}

impl RecognitionMatch {
    pub fn level(&self) -> SimilarityLevel {
        SimilarityLevel::from_score(self.similarity)
    }

    pub fn display_name(&self) -> &str {
        shown_name(self.name.as_deref())
    }

    pub fn display_person_id(&self) -> &str {
        shown_person_id(self.person_id.as_deref())
    }

    pub fn display_remark(&self) -> Option<&str> {
        visible_remark(self.remark.as_deref())
    }
}

/// Confidence tier used for the similarity badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityLevel {
    High,
    Medium,
    Low,
}

impl SimilarityLevel {
    /// Tiers are inclusive on their lower bound: 0.8 is high, 0.6 is medium.
    pub fn from_score(similarity: f32) -> Self {
        if similarity >= 0.8 {
            SimilarityLevel::High
        } else if similarity >= 0.6 {
            SimilarityLevel::Medium
        } else {
            SimilarityLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityLevel::High => "high",
            SimilarityLevel::Medium => "medium",
            SimilarityLevel::Low => "low",
        }
    }
}

impl std::fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn shown_name(name: Option<&str>) -> &str {
    non_empty(name).unwrap_or("unknown")
}

fn shown_person_id(person_id: Option<&str>) -> &str {
    non_empty(person_id).unwrap_or("N/A")
}

fn visible_remark(remark: Option<&str>) -> Option<&str> {
    non_empty(remark).filter(|r| *r != "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_level_boundaries() {
        assert_eq!(SimilarityLevel::from_score(0.8), SimilarityLevel::High);
        assert_eq!(SimilarityLevel::from_score(0.95), SimilarityLevel::High);
        assert_eq!(SimilarityLevel::from_score(0.6), SimilarityLevel::Medium);
        assert_eq!(SimilarityLevel::from_score(0.79), SimilarityLevel::Medium);
        assert_eq!(SimilarityLevel::from_score(0.59), SimilarityLevel::Low);
        assert_eq!(SimilarityLevel::from_score(0.0), SimilarityLevel::Low);
    }

    #[test]
    fn test_similarity_level_names() {
        assert_eq!(SimilarityLevel::from_score(0.8).to_string(), "high");
        assert_eq!(SimilarityLevel::from_score(0.6).to_string(), "medium");
        assert_eq!(SimilarityLevel::from_score(0.59).to_string(), "low");
    }

    #[test]
    fn test_face_record_accepts_register_time() {
        let json = r#"{"faceId":"f1","personId":"p1","name":"Ann","remark":null,"registerTime":1700000000000}"#;
        let record: FaceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.face_id, "f1");
        assert_eq!(record.create_time, Some(1_700_000_000_000));
    }

    #[test]
    fn test_face_record_accepts_create_time() {
        let json = r#"{"faceId":"f1","personId":"p1","name":"Ann","createTime":42}"#;
        let record: FaceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.create_time, Some(42));
    }

    #[test]
    fn test_face_record_display_fallbacks() {
        let record = FaceRecord {
            face_id: "f1".into(),
            person_id: None,
            name: Some("  ".into()),
            remark: Some("null".into()),
            create_time: None,
        };
        assert_eq!(record.display_name(), "unknown");
        assert_eq!(record.display_person_id(), "N/A");
        assert_eq!(record.display_remark(), None);
    }

    #[test]
    fn test_match_without_face_id() {
        let json = r#"{"personId":"p1","name":"Ann","similarity":0.91}"#;
        let m: RecognitionMatch = serde_json::from_str(json).unwrap();
        assert_eq!(m.face_id, None);
        assert_eq!(m.level(), SimilarityLevel::High);
    }

    #[test]
    fn test_match_tolerates_null_person_fields() {
        // Same record shape the listing accepts.
        let json = r#"{"faceId":"f1","personId":null,"name":null,"remark":"null","similarity":0.7}"#;
        let m: RecognitionMatch = serde_json::from_str(json).unwrap();
        assert_eq!(m.display_name(), "unknown");
        assert_eq!(m.display_person_id(), "N/A");
        assert_eq!(m.display_remark(), None);

        let m: RecognitionMatch = serde_json::from_str(r#"{"similarity":0.5}"#).unwrap();
        assert_eq!(m.name, None);
        assert_eq!(m.level(), SimilarityLevel::Low);
    }
}
