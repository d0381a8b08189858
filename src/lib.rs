//! mbox to Google Groups importer
//!
//! Bulk-imports archived email, stored as mbox files with one directory per
//! destination group, into the Google Groups archive.
//!
//! # Overview
//!
//! Input layout is `<root>/<group@domain>/<label-path>.mbox`. For every group
//! directory the importer:
//! - confirms the group exists (a missing group aborts the run)
//! - walks the directory, turning each `.mbox` file's relative path into a
//!   label name
//! - reads the file's messages in order and uploads each one exactly once
//! - tallies successes and failures per label and per group
//!
//! # Example Usage
//!
//! ```no_run
//! use mbox_group_import::{auth, ImportRunner, ImportSettings, ProductionGroupsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hubs = auth::initialize_groups_hubs(
//!         "cred.json".as_ref(),
//!         "admin@example.com",
//!         "mbox-group-import/0.1.0",
//!     )
//!     .await?;
//!     let client = ProductionGroupsClient::new(hubs);
//!
//!     let settings = ImportSettings::new("mailbox-to-import", "admin@example.com");
//!     let report = ImportRunner::new(&client, &settings).run().await?;
//!     println!("{}", report.totals());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`accumulator`] - Message, label and group counters
//! - [`auth`] - Service-account delegation and API hub construction
//! - [`checkpoint`] - Resume offset and per-file checkpoints
//! - [`cli`] - Command-line interface
//! - [`client`] - Groups API client trait and production implementation
//! - [`config`] - Configuration file
//! - [`error`] - Error types and result aliases
//! - [`importer`] - Per-group orchestration and the run driver
//! - [`label`] - Label names from file paths
//! - [`logging`] - Console and rotating file logging
//! - [`mbox`] - mbox archive reader
//! - [`settings`] - Immutable run settings
//! - [`uploader`] - Single-attempt message upload

pub mod accumulator;
pub mod auth;
pub mod checkpoint;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod importer;
pub mod label;
pub mod logging;
pub mod mbox;
pub mod settings;
pub mod uploader;

pub use error::{ImportError, Result};

pub use accumulator::{GroupResult, ImportAccumulator, LabelOutcome};
pub use checkpoint::{ImportCheckpoint, ResumeTracker};
pub use client::{GroupsClient, ProductionGroupsClient};
pub use config::Config;
pub use importer::{GroupImporter, ImportRunner, RunReport};
pub use label::LabelDecision;
pub use mbox::{ArchivedMessage, MboxArchive};
pub use settings::ImportSettings;
pub use uploader::{MessageUploader, UploadOutcome};
