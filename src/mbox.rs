//! Sequential reader for mbox archives

use mail_parser::mailbox::mbox::MessageIterator;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ImportError, Result};
use crate::label::NESTED_EXPORT_FILE;

/// One message extracted from an mbox file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedMessage {
    /// Zero-based position within the file
    pub index: usize,
    /// Serialized RFC 822 message, without the mbox `From ` separator line
    pub contents: Vec<u8>,
}

/// An opened mbox archive
///
/// Iteration is lazy and single-pass; calling [`MboxArchive::messages`]
/// again reopens the file and yields the same sequence.
#[derive(Debug, Clone)]
pub struct MboxArchive {
    path: PathBuf,
}

impl MboxArchive {
    /// Open an archive, substituting the inner `mbox` file when `path` is a
    /// directory.
    pub fn open(path: &Path) -> Result<Self> {
        let path = if path.is_dir() {
            let inner = path.join(NESTED_EXPORT_FILE);
            info!("Using '{}' instead of the directory", inner.display());
            inner
        } else {
            path.to_path_buf()
        };

        // Unopenable files fail here, before any upload
        File::open(&path).map_err(|e| archive_error(&path, e))?;

        Ok(Self { path })
    }

    /// Path of the file actually read
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of messages physically present in the file
    pub fn count(&self) -> Result<usize> {
        let mut total = 0;
        for message in self.messages()? {
            message?;
            total += 1;
        }
        Ok(total)
    }

    /// Lazily iterate over the messages in file order
    pub fn messages(&self) -> Result<ArchiveMessages> {
        let file = File::open(&self.path).map_err(|e| archive_error(&self.path, e))?;
        Ok(ArchiveMessages {
            path: self.path.clone(),
            inner: MessageIterator::new(BufReader::new(file)),
            next_index: 0,
        })
    }
}

/// Iterator over the messages of one archive
pub struct ArchiveMessages {
    path: PathBuf,
    inner: MessageIterator<BufReader<File>>,
    next_index: usize,
}

impl Iterator for ArchiveMessages {
    type Item = Result<ArchivedMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        let message = self.inner.next()?;
        let index = self.next_index;
        self.next_index += 1;

        Some(match message {
            Ok(message) => Ok(ArchivedMessage {
                index,
                contents: requote_from_lines(message.unwrap_contents()),
            }),
            Err(_) => Err(ImportError::ArchiveError {
                path: self.path.clone(),
                message: format!("failed to read message {}", index),
            }),
        })
    }
}

/// Put back the `>` the reader strips from `>From ` lines, so the contents
/// match the archive byte for byte
///
/// The reader removes one `>` from every line matching `^>+From `. A line in
/// the stripped contents matching `^>*From ` therefore had one more `>` on
/// disk; bare `From ` lines cannot occur in a message body.
fn requote_from_lines(contents: Vec<u8>) -> Vec<u8> {
    fn is_quoted_from(line: &[u8]) -> bool {
        line.iter()
            .position(|&ch| ch != b'>')
            .map(|start| line[start..].starts_with(b"From "))
            .unwrap_or(false)
    }

    if !contents.split(|&ch| ch == b'\n').any(is_quoted_from) {
        return contents;
    }

    let mut out = Vec::with_capacity(contents.len() + 16);
    for line in contents.split_inclusive(|&ch| ch == b'\n') {
        if is_quoted_from(line) {
            out.push(b'>');
        }
        out.extend_from_slice(line);
    }
    out
}

fn archive_error(path: &Path, error: std::io::Error) -> ImportError {
    ImportError::ArchiveError {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
