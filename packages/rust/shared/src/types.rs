//! Core domain types for Leadscout discovery runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// EventDescription
// ---------------------------------------------------------------------------

/// The event a run is sourcing people for. Supplied once per run and never
/// mutated by the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventDescription {
    /// Event name.
    pub name: String,
    /// Event date (freeform, e.g. "2025-05-18").
    #[serde(default)]
    pub date: String,
    /// Venue / city.
    #[serde(default)]
    pub location: String,
    /// "in-person", "hybrid", or "virtual".
    #[serde(default)]
    pub format: String,
    /// Expected audience size (freeform).
    #[serde(default)]
    pub audience_size: String,
    /// Who the event is for.
    #[serde(default)]
    pub target_groups: String,
    /// Sponsorship amount being raised.
    #[serde(default)]
    pub funding_need: String,
    /// Non-monetary needs (catering, AV, ...).
    #[serde(default)]
    pub in_kind_needs: String,
    /// Speaker/panelist requirements.
    #[serde(default)]
    pub speakers_needed: String,
    /// Previous sponsors, for context.
    #[serde(default)]
    pub past_sponsors: String,
    /// One-line theme statement.
    #[serde(default)]
    pub theme: String,
}

// ---------------------------------------------------------------------------
// KeywordSet
// ---------------------------------------------------------------------------

/// Related entities extracted from an event description, used to seed
/// query generation. One set is derived per round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    /// Companies and other organizations.
    pub organizations: Vec<String>,
    /// Universities and research institutions.
    pub institutions: Vec<String>,
    /// Professional roles and titles.
    pub roles: Vec<String>,
}

impl KeywordSet {
    /// True if no keywords were extracted at all.
    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty() && self.institutions.is_empty() && self.roles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CandidateProfile
// ---------------------------------------------------------------------------

/// A person record as returned by the profile-search collaborator.
/// Immutable once received; the pipeline never edits collaborator fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// External identifier assigned by the search service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Canonical profile URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    /// Current location (freeform).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Profile headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    /// Current job title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-text bio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

impl CandidateProfile {
    /// Best-effort identity key used to recognize two records as the same
    /// person. Priority: canonical URL, external id, display name, and as a
    /// last resort a content hash of the whole record — so every profile has
    /// a key and none is silently dropped during dedup.
    pub fn identity_key(&self) -> String {
        if let Some(url) = self.linkedin_url.as_deref() {
            if !url.is_empty() {
                return format!("url:{url}");
            }
        }
        if let Some(id) = self.id {
            return format!("id:{id}");
        }
        if let Some(name) = self.name.as_deref() {
            if !name.is_empty() {
                return format!("name:{name}");
            }
        }
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("hash:{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// ScoredCandidate
// ---------------------------------------------------------------------------

/// A candidate paired with a relevance score from the batch-scoring
/// collaborator. Scores are 1–10; ties keep arrival order in the final sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// The scored profile.
    pub profile: CandidateProfile,
    /// Relevance score, 1 (poor fit) to 10 (ideal).
    pub score: i32,
    /// Free-text justification for the score.
    pub explanation: String,
}

// ---------------------------------------------------------------------------
// QualityVerdict
// ---------------------------------------------------------------------------

/// Outcome of the quality-assessment collaborator for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Whether the round's candidates are good enough to stop.
    pub is_high_quality: bool,
    /// Main issues when not high quality (seniority, relevance, diversity...).
    #[serde(default)]
    pub issues: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(
        id: Option<i64>,
        name: Option<&str>,
        url: Option<&str>,
    ) -> CandidateProfile {
        CandidateProfile {
            id,
            name: name.map(String::from),
            linkedin_url: url.map(String::from),
            location: None,
            headline: None,
            title: None,
            description: None,
            profile_picture_url: None,
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn identity_key_prefers_url() {
        let p = profile(Some(7), Some("Ada"), Some("https://linkedin.com/in/ada"));
        assert_eq!(p.identity_key(), "url:https://linkedin.com/in/ada");
    }

    #[test]
    fn identity_key_falls_back_to_id_then_name() {
        let p = profile(Some(7), Some("Ada"), None);
        assert_eq!(p.identity_key(), "id:7");

        let p = profile(None, Some("Ada"), None);
        assert_eq!(p.identity_key(), "name:Ada");
    }

    #[test]
    fn identity_key_hashes_anonymous_records() {
        let p = profile(None, None, None);
        let key = p.identity_key();
        assert!(key.starts_with("hash:"));
        // Same content, same key.
        assert_eq!(key, profile(None, None, None).identity_key());
    }

    #[test]
    fn identity_key_ignores_empty_url() {
        let p = profile(Some(3), None, Some(""));
        assert_eq!(p.identity_key(), "id:3");
    }

    #[test]
    fn event_description_partial_json() {
        let json = r#"{"name": "Climate Demo Day", "theme": "urban climate tech"}"#;
        let event: EventDescription = serde_json::from_str(json).expect("deserialize");
        assert_eq!(event.name, "Climate Demo Day");
        assert_eq!(event.theme, "urban climate tech");
        assert!(event.location.is_empty());
    }

    #[test]
    fn scored_candidate_serde_roundtrip() {
        let scored = ScoredCandidate {
            profile: profile(Some(1), Some("Ada"), None),
            score: 9,
            explanation: "keynote experience".into(),
        };
        let json = serde_json::to_string(&scored).expect("serialize");
        assert!(json.contains(r#""score":9"#));
        let parsed: ScoredCandidate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, scored);
    }
}
