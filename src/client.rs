//! Google Groups API client

use async_trait::async_trait;
use std::fmt::Display;
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

use crate::auth::{GroupsHubs, MigrationHub, SettingsHub, MIGRATION_SCOPE, SETTINGS_SCOPE};
use crate::error::{group_lookup_error, ImportError, Result};

/// MIME type of a single archived message
pub const MESSAGE_MIME_TYPE: &str = "message/rfc822";

/// Trait defining the Groups operations the importer needs, for easier testing
#[async_trait]
pub trait GroupsClient: Send + Sync {
    /// Confirm that a group exists and is visible to the delegated principal
    async fn verify_group(&self, group_id: &str) -> Result<()>;

    /// Insert one RFC 822 message into the group archive
    async fn insert_archive_message(&self, group_id: &str, message: &[u8]) -> Result<()>;
}

/// Production client backed by the Groups Migration and Groups Settings hubs
///
/// Every call is a single attempt; callers decide what a failure means.
pub struct ProductionGroupsClient {
    migration: MigrationHub,
    settings: SettingsHub,
}

impl ProductionGroupsClient {
    pub fn new(hubs: GroupsHubs) -> Self {
        Self {
            migration: hubs.migration,
            settings: hubs.settings,
        }
    }
}

#[async_trait]
impl GroupsClient for ProductionGroupsClient {
    async fn verify_group(&self, group_id: &str) -> Result<()> {
        let (_, group) = self
            .settings
            .groups()
            .get(group_id)
            .add_scope(SETTINGS_SCOPE)
            .doit()
            .await
            .map_err(|e| group_lookup_error(group_id, e))?;

        debug!(
            "Group {} resolved (name: {})",
            group_id,
            group.name.as_deref().unwrap_or("<unnamed>")
        );
        Ok(())
    }

    async fn insert_archive_message(&self, group_id: &str, message: &[u8]) -> Result<()> {
        // Simple media upload of the raw message
        let (_, response) = self
            .migration
            .archive()
            .insert(group_id)
            .add_scope(MIGRATION_SCOPE)
            .upload(Cursor::new(message.to_vec()), message_mime_type()?)
            .await?;

        match response.response_code.as_deref() {
            None | Some("SUCCESS") => Ok(()),
            Some(code) => Err(ImportError::ApiError(format!(
                "Archive insert into {} returned {}",
                group_id, code
            ))),
        }
    }
}

fn message_mime_type<M>() -> Result<M>
where
    M: FromStr,
    M::Err: Display,
{
    MESSAGE_MIME_TYPE
        .parse()
        .map_err(|e| ImportError::Unknown(format!("Invalid MIME type {}: {}", MESSAGE_MIME_TYPE, e)))
}
