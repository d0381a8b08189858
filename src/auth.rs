//! Service-account authentication for the Google Groups APIs

use google_groupsmigration1::{hyper_rustls, hyper_util, yup_oauth2, GroupsMigration};
use google_groupssettings1::Groupssettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ImportError, Result};

/// Scope for inserting messages into a group archive
pub const MIGRATION_SCOPE: &str = "https://www.googleapis.com/auth/apps.groups.migration";

/// Scope for reading group settings (used to confirm a group exists)
pub const SETTINGS_SCOPE: &str = "https://www.googleapis.com/auth/apps.groups.settings";

/// Scopes requested when the delegated token is minted
pub const REQUIRED_SCOPES: &[&str] = &[SETTINGS_SCOPE, MIGRATION_SCOPE];

type Connector = hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Type alias for the Groups Migration hub
pub type MigrationHub = GroupsMigration<Connector>;

/// Type alias for the Groups Settings hub
pub type SettingsHub = Groupssettings<Connector>;

/// Hubs sharing one delegated authenticator and HTTP client
pub struct GroupsHubs {
    pub migration: MigrationHub,
    pub settings: SettingsHub,
}

/// Build both API hubs from a service-account key, impersonating `group_owner`
///
/// The token is fetched once up front so that a bad key or missing
/// domain-wide delegation fails here rather than on the first upload.
pub async fn initialize_groups_hubs(
    service_account_key: &Path,
    group_owner: &str,
    user_agent: &str,
) -> Result<GroupsHubs> {
    let key = yup_oauth2::read_service_account_key(service_account_key)
        .await
        .map_err(|e| {
            ImportError::AuthError(format!(
                "Failed to read service account key {:?}: {}",
                service_account_key, e
            ))
        })?;

    debug!(
        "Loaded service account key for {} (delegating to {})",
        key.client_email, group_owner
    );

    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .subject(group_owner)
        .build()
        .await
        .map_err(|e| ImportError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    auth.token(REQUIRED_SCOPES).await.map_err(|e| {
        ImportError::AuthError(format!(
            "Failed to obtain delegated token for {}: {}",
            group_owner, e
        ))
    })?;

    // HTTP/1 only
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| ImportError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    let mut migration = GroupsMigration::new(client.clone(), auth.clone());
    migration.user_agent(user_agent.to_string());
    let mut settings = Groupssettings::new(client, auth);
    settings.user_agent(user_agent.to_string());

    info!("Authenticated as {} for Groups APIs", group_owner);

    Ok(GroupsHubs {
        migration,
        settings,
    })
}

/// Minimal view of a service-account key file, used to validate it before
/// any network call is made
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceAccountSummary {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Load and sanity-check a service-account key file
pub async fn load_key_summary(path: &Path) -> Result<ServiceAccountSummary> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ImportError::AuthError(format!(
            "Failed to read service account key {:?}: {}",
            path, e
        ))
    })?;
    let summary: ServiceAccountSummary = serde_json::from_str(&content)?;
    if summary.key_type != "service_account" {
        return Err(ImportError::AuthError(format!(
            "{:?} is a '{}' key, expected 'service_account'",
            path, summary.key_type
        )));
    }
    Ok(summary)
}
