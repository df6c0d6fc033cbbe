use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::classifier::ClassificationResult;
use crate::error::PipelineError;
use crate::source::SourceTag;

const PREVIEW_CHARS: usize = 200;

/// One processed message. Immutable after creation; built by the monitor and
/// handed to the store.
#[derive(Debug, Clone, Serialize)]
pub struct EmailRecord {
    pub user_id: String,
    pub subject: String,
    pub body: String,
    pub body_preview: String,
    pub received_at: DateTime<Utc>,
    pub is_phishing: bool,
    pub probability: f64,
    pub source_tag: SourceTag,
}

impl EmailRecord {
    pub fn new(
        user_id: &str,
        subject: String,
        body: String,
        verdict: ClassificationResult,
        source_tag: SourceTag,
    ) -> Self {
        let body_preview = preview(&body);
        Self {
            user_id: user_id.to_string(),
            subject,
            body,
            body_preview,
            received_at: Utc::now(),
            is_phishing: verdict.is_phishing,
            probability: verdict.probability,
            source_tag,
        }
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        let cut: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}

/// Raised for a persisted email whose phishing probability crossed the alert
/// threshold. `is_read` is flipped by outer layers only.
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub email_id: i64,
    pub user_id: String,
    pub subject: String,
    pub probability: f64,
    pub triggered_at: DateTime<Utc>,
    pub is_read: bool,
    pub source_tag: SourceTag,
}

impl AlertRecord {
    pub fn for_email(email_id: i64, email: &EmailRecord) -> Self {
        Self {
            email_id,
            user_id: email.user_id.clone(),
            subject: email.subject.clone(),
            probability: email.probability,
            triggered_at: Utc::now(),
            is_read: false,
            source_tag: email.source_tag,
        }
    }
}

/// Persistence collaborator. Writes are fire-and-forget from the monitor's
/// perspective: failures are reported, not retried.
pub trait EmailStore: Send + Sync {
    fn save_email(&self, record: &EmailRecord) -> Result<i64, PipelineError>;
    fn save_alert(&self, record: &AlertRecord) -> Result<i64, PipelineError>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::PersistenceFailure(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, PipelineError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                body_preview TEXT NOT NULL,
                received_at TEXT NOT NULL,
                is_phishing INTEGER NOT NULL,
                probability REAL NOT NULL,
                source_tag TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id INTEGER NOT NULL REFERENCES emails(id),
                user_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                probability REAL NOT NULL,
                triggered_at TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                source_tag TEXT NOT NULL
            );",
        )
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PipelineError> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::PersistenceFailure("database lock poisoned".to_string()))
    }
}

impl EmailStore for SqliteStore {
    fn save_email(&self, record: &EmailRecord) -> Result<i64, PipelineError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO emails (user_id, subject, body, body_preview, received_at,
                                 is_phishing, probability, source_tag)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.user_id,
                record.subject,
                record.body,
                record.body_preview,
                record.received_at.to_rfc3339(),
                record.is_phishing,
                record.probability,
                record.source_tag.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn save_alert(&self, record: &AlertRecord) -> Result<i64, PipelineError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO alerts (email_id, user_id, subject, probability, triggered_at,
                                 is_read, source_tag)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.email_id,
                record.user_id,
                record.subject,
                record.probability,
                record.triggered_at.to_rfc3339(),
                record.is_read,
                record.source_tag.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    emails: Mutex<Vec<EmailRecord>>,
    alerts: Mutex<Vec<AlertRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emails(&self) -> Vec<EmailRecord> {
        self.emails.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl EmailStore for MemoryStore {
    fn save_email(&self, record: &EmailRecord) -> Result<i64, PipelineError> {
        let mut emails = self
            .emails
            .lock()
            .map_err(|_| PipelineError::PersistenceFailure("store lock poisoned".to_string()))?;
        emails.push(record.clone());
        Ok(emails.len() as i64)
    }

    fn save_alert(&self, record: &AlertRecord) -> Result<i64, PipelineError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| PipelineError::PersistenceFailure("store lock poisoned".to_string()))?;
        alerts.push(record.clone());
        Ok(alerts.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(is_phishing: bool, probability: f64) -> ClassificationResult {
        ClassificationResult {
            is_phishing,
            probability,
        }
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(250);
        let record = EmailRecord::new(
            "u1",
            "s".to_string(),
            long,
            verdict(false, 0.1),
            SourceTag::Demo,
        );
        assert_eq!(record.body_preview.chars().count(), 203);
        assert!(record.body_preview.ends_with("..."));

        let short = EmailRecord::new(
            "u1",
            "s".to_string(),
            "short body".to_string(),
            verdict(false, 0.1),
            SourceTag::Demo,
        );
        assert_eq!(short.body_preview, "short body");
    }

    #[test]
    fn sqlite_store_persists_emails_and_alerts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let email = EmailRecord::new(
            "u1",
            "Urgent".to_string(),
            "verify now".to_string(),
            verdict(true, 0.9),
            SourceTag::Real,
        );
        let email_id = store.save_email(&email).unwrap();
        assert!(email_id > 0);

        let alert = AlertRecord::for_email(email_id, &email);
        assert!(!alert.is_read);
        let alert_id = store.save_alert(&alert).unwrap();
        assert!(alert_id > 0);

        let conn = store.lock().unwrap();
        let (stored_subject, stored_email_id): (String, i64) = conn
            .query_row(
                "SELECT subject, email_id FROM alerts WHERE id = ?1",
                params![alert_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(stored_subject, "Urgent");
        assert_eq!(stored_email_id, email_id);
    }

    #[test]
    fn memory_store_accumulates_records() {
        let store = MemoryStore::new();
        let email = EmailRecord::new(
            "u1",
            "s".to_string(),
            "b".to_string(),
            verdict(true, 0.8),
            SourceTag::Demo,
        );
        let id = store.save_email(&email).unwrap();
        store.save_alert(&AlertRecord::for_email(id, &email)).unwrap();
        assert_eq!(store.emails().len(), 1);
        assert_eq!(store.alerts().len(), 1);
        assert_eq!(store.alerts()[0].email_id, id);
    }
}
