//! Single-attempt upload of one archived message

use tracing::error;

use crate::client::GroupsClient;
use crate::error::ImportError;
use crate::mbox::ArchivedMessage;

/// Result of one upload attempt
#[derive(Debug)]
pub enum UploadOutcome {
    Imported,
    Failed(ImportError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Imported)
    }
}

/// Sends messages to a group archive, one attempt each
///
/// Failures are logged and handed back as [`UploadOutcome::Failed`]; they
/// never propagate as errors, so one rejected message cannot stop the
/// messages after it.
pub struct MessageUploader<'a, C: GroupsClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: GroupsClient + ?Sized> MessageUploader<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub async fn upload(
        &self,
        group_id: &str,
        label: &str,
        message: &ArchivedMessage,
    ) -> UploadOutcome {
        match self
            .client
            .insert_archive_message(group_id, &message.contents)
            .await
        {
            Ok(()) => UploadOutcome::Imported,
            Err(e) => {
                error!(
                    group = group_id,
                    label = label,
                    index = message.index,
                    size = message.contents.len(),
                    transient = e.is_transient(),
                    "Failed to import mbox message: {}",
                    e
                );
                UploadOutcome::Failed(e)
            }
        }
    }
}
