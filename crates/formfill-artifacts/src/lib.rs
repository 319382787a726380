//! Submission artifact packaging
//!
//! A completed submission produces two artifacts: the filled PDF and the
//! answer list as JSON for archival, handed unmodified to whatever storage
//! backend the host application wires in. The backend itself (protocol,
//! retries, auth) is out of scope here; [`ArtifactSink`] is the seam.

use chrono::NaiveDate;
use formfill_core::AnswerRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage sink failed: {0}")]
    Sink(String),
}

/// Finished bytes plus the metadata a storage sink needs to file them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What a sink reports back after accepting an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub id: String,
    pub link: Option<String>,
}

/// An opaque remote-storage destination. Implementations own their transport
/// concerns; callers hand over finished bytes and a filename, nothing more.
pub trait ArtifactSink {
    fn store(&self, artifact: &Artifact) -> Result<StoredArtifact, ArtifactError>;
}

/// Base name for a submission's artifacts:
/// `{given}_{surname}_answers_{YYYY-MM-DD}`, spaces folded to underscores.
pub fn submission_basename(given_names: &str, surname: &str, date: NaiveDate) -> String {
    let given = name_part(given_names, "noname");
    let surname = name_part(surname, "nosurname");
    format!("{}_{}_answers_{}", given, surname, date.format("%Y-%m-%d"))
}

fn name_part(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.replace(' ', "_")
    }
}

/// Serialize the answer list as pretty-printed JSON, unmodified, for the
/// archival artifact.
pub fn answers_json(answers: &[AnswerRecord]) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(answers).map_err(|e| ArtifactError::Serialization(e.to_string()))
}

/// Bundle a submission's filled PDF and its answers into the artifact pair
/// a sink expects.
pub fn submission_artifacts(
    pdf_bytes: Vec<u8>,
    answers: &[AnswerRecord],
    given_names: &str,
    surname: &str,
    date: NaiveDate,
) -> Result<Vec<Artifact>, ArtifactError> {
    let basename = submission_basename(given_names, surname, date);

    Ok(vec![
        Artifact {
            filename: format!("{}.pdf", basename),
            content_type: "application/pdf".to_string(),
            bytes: pdf_bytes,
        },
        Artifact {
            filename: format!("{}.json", basename),
            content_type: "application/json".to_string(),
            bytes: answers_json(answers)?,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Test double that records everything stored.
    struct MemorySink {
        stored: RefCell<Vec<Artifact>>,
    }

    impl MemorySink {
        fn new() -> Self {
            Self {
                stored: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArtifactSink for MemorySink {
        fn store(&self, artifact: &Artifact) -> Result<StoredArtifact, ArtifactError> {
            self.stored.borrow_mut().push(artifact.clone());
            Ok(StoredArtifact {
                id: format!("mem-{}", self.stored.borrow().len()),
                link: None,
            })
        }
    }

    fn answer(field_id: &str, question: &str, answer: &str) -> AnswerRecord {
        AnswerRecord {
            field_id: field_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_basename_convention() {
        assert_eq!(
            submission_basename("Jane Marie", "Doe", date()),
            "Jane_Marie_Doe_answers_2025-03-14"
        );
    }

    #[test]
    fn test_basename_falls_back_for_empty_names() {
        assert_eq!(
            submission_basename("", "  ", date()),
            "noname_nosurname_answers_2025-03-14"
        );
    }

    #[test]
    fn test_answers_json_round_trips_unmodified() {
        let answers = vec![
            answer("7", "Given name(s):", "Jane"),
            answer("checkbox 3", "Citizen? - Yes", "Yes"),
        ];

        let bytes = answers_json(&answers).unwrap();
        let decoded: Vec<AnswerRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, answers);
    }

    #[test]
    fn test_submission_artifacts_pair() {
        let answers = vec![answer("7", "Given name(s):", "Jane")];
        let artifacts =
            submission_artifacts(b"%PDF-1.7".to_vec(), &answers, "Jane", "Doe", date()).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "Jane_Doe_answers_2025-03-14.pdf");
        assert_eq!(artifacts[0].content_type, "application/pdf");
        assert_eq!(artifacts[0].bytes, b"%PDF-1.7");
        assert_eq!(artifacts[1].filename, "Jane_Doe_answers_2025-03-14.json");
        assert_eq!(artifacts[1].content_type, "application/json");
    }

    #[test]
    fn test_sink_receives_both_artifacts() {
        let answers = vec![answer("7", "Given name(s):", "Jane")];
        let artifacts =
            submission_artifacts(b"%PDF-1.7".to_vec(), &answers, "Jane", "Doe", date()).unwrap();

        let sink = MemorySink::new();
        let receipts: Vec<StoredArtifact> = artifacts
            .iter()
            .map(|a| sink.store(a).unwrap())
            .collect();

        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[0].id, "mem-1");
        assert_eq!(sink.stored.borrow().len(), 2);
    }
}
