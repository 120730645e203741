//! Candidate de-duplication across queries and rounds.

use std::collections::HashSet;

use tracing::debug;

use leadscout_shared::CandidateProfile;

/// Drop duplicate candidates, keeping the first occurrence of each identity
/// key. Order is otherwise preserved, so earlier-arriving results win.
pub fn dedup(candidates: Vec<CandidateProfile>) -> Vec<CandidateProfile> {
    let total = candidates.len();
    let mut seen = HashSet::with_capacity(total);
    let mut unique = Vec::with_capacity(total);
    for candidate in candidates {
        if seen.insert(candidate.identity_key()) {
            unique.push(candidate);
        }
    }
    if unique.len() < total {
        debug!(total, unique = unique.len(), "dropped duplicate candidates");
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(name: &str, url: &str) -> CandidateProfile {
        CandidateProfile {
            name: Some(name.to_string()),
            linkedin_url: Some(url.to_string()),
            ..CandidateProfile::default()
        }
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let candidates = vec![
            with_url("Ada", "https://linkedin.com/in/ada"),
            with_url("Grace", "https://linkedin.com/in/grace"),
            with_url("Ada (dup)", "https://linkedin.com/in/ada"),
        ];

        let unique = dedup(candidates);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name.as_deref(), Some("Ada"));
        assert_eq!(unique[1].name.as_deref(), Some("Grace"));
    }

    #[test]
    fn distinct_urls_survive_even_with_same_name() {
        let candidates = vec![
            with_url("Alex Kim", "https://linkedin.com/in/alexkim1"),
            with_url("Alex Kim", "https://linkedin.com/in/alexkim2"),
        ];

        assert_eq!(dedup(candidates).len(), 2);
    }

    #[test]
    fn is_idempotent() {
        let candidates = vec![
            with_url("Ada", "https://linkedin.com/in/ada"),
            with_url("Ada", "https://linkedin.com/in/ada"),
            with_url("Grace", "https://linkedin.com/in/grace"),
        ];

        let once = dedup(candidates);
        let twice = dedup(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(dedup(Vec::new()).is_empty());
    }

    #[test]
    fn records_without_any_identifier_still_dedupe() {
        // No id, url, or name: the content-hash fallback keys them, so
        // verbatim duplicates collapse to one entry.
        let blank = CandidateProfile {
            headline: Some("stealth founder".to_string()),
            ..CandidateProfile::default()
        };
        let unique = dedup(vec![blank.clone(), blank.clone()]);
        assert_eq!(unique.len(), 1);
    }
}
