use crate::error::{Outcome, Warning};
use crate::storage::{ObjectStore, CONTACT_LOG_KEY};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Fields the contact form supplies. Year and section arrive as free text.
#[derive(Debug, Clone)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub year: String,
    pub section: String,
    pub subject: String,
    pub message: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub year: String,
    pub section: String,
    pub subject: String,
    pub message: String,
    pub timestamp: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SubmissionLog {
    submissions: Vec<ContactSubmission>,
}

/// Append-only contact log shared across all scopes, stored as one JSON
/// document. Persistence is best-effort: a failed append is reported as a
/// warning and the submission is still acknowledged to the sender.
pub struct ContactLog {
    store: Arc<dyn ObjectStore>,
}

impl ContactLog {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn append(&self, input: ContactInput) -> Outcome<ContactSubmission> {
        let now = Utc::now().to_rfc3339();
        let submission = ContactSubmission {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            email: input.email,
            year: input.year,
            section: input.section,
            subject: input.subject,
            message: input.message,
            timestamp: input.timestamp.unwrap_or_else(|| now.clone()),
            status: "new".to_string(),
            created_at: now,
        };

        // Unreadable or missing log degrades to a fresh one
        let mut log = match self.store.get(CONTACT_LOG_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_default(),
            _ => SubmissionLog::default(),
        };
        log.submissions.push(submission.clone());

        let warnings = match serde_json::to_vec_pretty(&log) {
            Ok(bytes) => match self.store.put(CONTACT_LOG_KEY, bytes, "application/json").await {
                Ok(()) => Vec::new(),
                Err(e) => {
                    warn!("Failed to persist contact submission: {}", e);
                    vec![Warning::ContactLogDropped {
                        reason: e.to_string(),
                    }]
                }
            },
            Err(e) => vec![Warning::ContactLogDropped {
                reason: e.to_string(),
            }],
        };

        Outcome::with_warnings(submission, warnings)
    }
}
