//! Common test utilities and fixtures

#![allow(dead_code)]

use mbox_group_import::client::GroupsClient;
use mbox_group_import::error::{ImportError, Result};
use mockall::mock;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// Render an mbox file holding one short message per subject
pub fn mbox_contents(subjects: &[&str]) -> String {
    let mut out = String::new();
    for (i, subject) in subjects.iter().enumerate() {
        out.push_str(&format!(
            "From sender{}@example.com Mon Jan  1 10:00:{:02} 2024\n",
            i,
            i % 60
        ));
        out.push_str(&format!("From: sender{}@example.com\n", i));
        out.push_str(&format!("Subject: {}\n", subject));
        out.push_str("\n");
        out.push_str(&format!("Body of message {}\n", i));
        out.push_str("\n");
    }
    out
}

/// Subjects `message 0`, `message 1`, ...
pub fn numbered_subjects(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("message {}", i)).collect()
}

/// Import root with helpers for laying out group directories
pub struct ImportTree {
    pub root: TempDir,
}

impl ImportTree {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn group_dir(&self, group: &str) -> PathBuf {
        let dir = self.root.path().join(group);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write `<root>/<group>/<relative>` containing the given subjects
    pub fn add_mbox(&self, group: &str, relative: &str, subjects: &[&str]) -> PathBuf {
        self.add_file(group, relative, &mbox_contents(subjects))
    }

    pub fn add_file(&self, group: &str, relative: &str, contents: &str) -> PathBuf {
        let path = self.group_dir(group).join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// Whether an uploaded payload carries the given subject
pub fn has_subject(message: &[u8], subject: &str) -> bool {
    String::from_utf8_lossy(message).contains(&format!("Subject: {}\n", subject))
}

pub fn rejected(message: &str) -> ImportError {
    ImportError::BadRequest(message.to_string())
}

// Mock implementation of GroupsClient for testing
mock! {
    pub GroupsClient {}

    #[async_trait::async_trait]
    impl GroupsClient for GroupsClient {
        async fn verify_group(&self, group_id: &str) -> Result<()>;
        async fn insert_archive_message(&self, group_id: &str, message: &[u8]) -> Result<()>;
    }
}

/// One recorded upload: group id and payload
#[derive(Debug, Clone)]
pub struct Upload {
    pub group: String,
    pub message: Vec<u8>,
}

impl Upload {
    pub fn subject(&self) -> Option<String> {
        String::from_utf8_lossy(&self.message)
            .lines()
            .find_map(|line| line.strip_prefix("Subject: ").map(|s| s.to_string()))
    }
}

pub type UploadLog = Arc<Mutex<Vec<Upload>>>;

/// Client that accepts every group and records each upload, rejecting
/// messages whose subject is in `fail_subjects`
pub fn recording_client(fail_subjects: &[&str]) -> (MockGroupsClient, UploadLog) {
    let log: UploadLog = Default::default();
    let fail_subjects: Vec<String> = fail_subjects.iter().map(|s| s.to_string()).collect();

    let mut client = MockGroupsClient::new();
    client.expect_verify_group().returning(|_| Ok(()));

    let recorder = log.clone();
    client
        .expect_insert_archive_message()
        .returning(move |group, message| {
            let upload = Upload {
                group: group.to_string(),
                message: message.to_vec(),
            };
            let failed = fail_subjects
                .iter()
                .any(|subject| has_subject(&upload.message, subject));
            recorder.lock().unwrap().push(upload);
            if failed {
                Err(rejected("message rejected"))
            } else {
                Ok(())
            }
        });

    (client, log)
}

pub fn uploaded_subjects(log: &UploadLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|upload| upload.subject())
        .collect()
}

/// Collects formatted log lines so tests can assert on what was logged
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Subscriber writing plain lines (`LEVEL message`) into this capture
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    /// Whether some line was logged at `level` and contains `text`
    pub fn contains(&self, level: &str, text: &str) -> bool {
        self.lines()
            .iter()
            .any(|line| line.trim_start().starts_with(level) && line.contains(text))
    }
}

pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbox_contents_has_separator_per_message() {
        let contents = mbox_contents(&["a", "b"]);
        assert_eq!(contents.matches("\nFrom sender").count() + 1, 2);
        assert!(contents.contains("Subject: a\n"));
    }

    #[test]
    fn test_log_capture_records_level_and_message() {
        let capture = LogCapture::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::warn!("careful with {}", "this");
        });

        assert!(capture.contains("WARN", "careful with this"));
        assert!(!capture.contains("ERROR", "careful with this"));
    }

    #[test]
    fn test_has_subject() {
        assert!(has_subject(b"From: x\nSubject: fail\n\nbody", "fail"));
        assert!(!has_subject(b"From: x\nSubject: failure\n\nbody", "fail"));
    }
}
