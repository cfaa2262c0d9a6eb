use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository as reported by the GitHub REST API.
///
/// Only the fields the CMS consumes are deserialized; everything else in
/// the API payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bytes of code per language, as returned by the repository languages
/// endpoint. BTreeMap keeps the serialization order stable.
pub type LanguageBreakdown = BTreeMap<String, u64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_repository_payload() {
        let payload = r#"{
            "name": "portfolio",
            "description": "My portfolio site",
            "html_url": "https://github.com/jdoe/portfolio",
            "language": "Python",
            "topics": ["django", "portfolio"],
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-06-01T12:30:00Z",
            "stargazers_count": 42
        }"#;

        let repo: RemoteRepository = serde_json::from_str(payload).unwrap();
        assert_eq!(repo.name, "portfolio");
        assert_eq!(repo.language.as_deref(), Some("Python"));
        assert_eq!(repo.topics, vec!["django", "portfolio"]);
    }

    #[test]
    fn test_missing_topics_defaults_empty() {
        let payload = r#"{
            "name": "bare",
            "description": null,
            "html_url": "https://github.com/jdoe/bare",
            "language": null,
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-01-15T10:00:00Z"
        }"#;

        let repo: RemoteRepository = serde_json::from_str(payload).unwrap();
        assert!(repo.topics.is_empty());
        assert!(repo.description.is_none());
        assert!(repo.language.is_none());
    }
}
