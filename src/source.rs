use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

/// Whether a message came from the simulated generator or a real mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Demo,
    Real,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Demo => write!(f, "demo"),
            SourceTag::Real => write!(f, "real"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawEmail {
    pub data: Vec<u8>,
    pub source_tag: SourceTag,
}

/// Supplies batches of raw messages to the monitor. A batch may be empty;
/// fetching must not block indefinitely.
pub trait EmailSource: Send {
    fn fetch_next_batch(&mut self) -> Result<Vec<RawEmail>>;
}

const DEMO_MESSAGES: [(&str, &str); 4] = [
    (
        "Urgent: Verify Your Bank Account",
        "Dear customer, we detected suspicious activity on your account. Please verify your \
         bank account immediately by clicking here: http://fake-bank-security.com/verify",
    ),
    (
        "Meeting Scheduled for Tomorrow",
        "Hi team, we have a meeting scheduled for tomorrow at 10 AM in the main conference \
         room. Please bring your project updates.",
    ),
    (
        "Your Account Will Be Suspended",
        "IMPORTANT: Your account will be suspended in 24 hours unless you confirm your \
         details. Click here: http://secure-verify-account.com",
    ),
    (
        "Project Update Request",
        "Hello, could you please provide an update on the current project status? We need \
         to prepare for the client meeting next week.",
    ),
];

/// Simulated mailbox: emits one canned batch, then nothing.
pub struct DemoSource {
    delivered: bool,
}

impl DemoSource {
    pub fn new() -> Self {
        Self { delivered: false }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailSource for DemoSource {
    fn fetch_next_batch(&mut self) -> Result<Vec<RawEmail>> {
        if self.delivered {
            return Ok(Vec::new());
        }
        self.delivered = true;
        Ok(DEMO_MESSAGES
            .iter()
            .map(|(subject, body)| RawEmail {
                data: format!("Subject: {subject}\r\n\r\n{body}").into_bytes(),
                source_tag: SourceTag::Demo,
            })
            .collect())
    }
}

/// Picks up `.eml` files dropped into a directory, each at most once per
/// source instance. Stands in for a real protocol client.
pub struct SpoolSource {
    dir: PathBuf,
    seen: HashSet<PathBuf>,
}

impl SpoolSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: HashSet::new(),
        }
    }
}

impl EmailSource for SpoolSource {
    fn fetch_next_batch(&mut self) -> Result<Vec<RawEmail>> {
        let mut batch = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("reading spool directory {}", self.dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "eml") {
                continue;
            }
            if !self.seen.insert(path.clone()) {
                continue;
            }
            let data = fs::read(&path)
                .with_context(|| format!("reading spooled message {}", path.display()))?;
            batch.push(RawEmail {
                data,
                source_tag: SourceTag::Real,
            });
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_source_emits_batch_once() {
        let mut source = DemoSource::new();
        let first = source.fetch_next_batch().unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|m| m.source_tag == SourceTag::Demo));
        assert!(source.fetch_next_batch().unwrap().is_empty());
    }

    #[test]
    fn spool_source_reads_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.eml"), "Subject: one\r\n\r\nbody").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = SpoolSource::new(dir.path());
        let first = source.fetch_next_batch().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].source_tag, SourceTag::Real);

        assert!(source.fetch_next_batch().unwrap().is_empty());

        fs::write(dir.path().join("b.eml"), "Subject: two\r\n\r\nbody").unwrap();
        assert_eq!(source.fetch_next_batch().unwrap().len(), 1);
    }

    #[test]
    fn spool_source_errors_on_missing_directory() {
        let mut source = SpoolSource::new("/nonexistent/spool/dir");
        assert!(source.fetch_next_batch().is_err());
    }
}
