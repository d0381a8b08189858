//! Import orchestration: one group at a time, one label file at a time,
//! one message at a time

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::accumulator::{GroupResult, ImportAccumulator};
use crate::checkpoint::ResumeTracker;
use crate::client::GroupsClient;
use crate::error::{ImportError, Result};
use crate::label::{self, LabelDecision};
use crate::mbox::MboxArchive;
use crate::settings::ImportSettings;
use crate::uploader::MessageUploader;

/// Imports every label file found under one group directory
pub struct GroupImporter<'a, C: GroupsClient + ?Sized> {
    client: &'a C,
    settings: &'a ImportSettings,
}

impl<'a, C: GroupsClient + ?Sized> GroupImporter<'a, C> {
    pub fn new(client: &'a C, settings: &'a ImportSettings) -> Self {
        Self { client, settings }
    }

    /// Walk the group directory and import each eligible mbox file
    ///
    /// Per-message failures are counted; an unreadable directory or mbox
    /// file aborts the group with an error.
    pub async fn import_group(
        &self,
        group_id: &str,
        resume: &mut ResumeTracker,
    ) -> Result<GroupResult> {
        let base = self.settings.group_dir(group_id);
        let mut accumulator = ImportAccumulator::new();

        for entry in WalkDir::new(&base).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ImportError::DirectoryError {
                path: e.path().unwrap_or(&base).to_path_buf(),
                message: e.to_string(),
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            match label::resolve_entry(&base, path) {
                LabelDecision::Eligible { label } => {
                    self.import_label_file(group_id, &label, path, &mut accumulator, resume)
                        .await?;
                }
                LabelDecision::Skipped { .. } => {
                    info!(
                        "Skipping '{}' because it doesn't have a .mbox extension",
                        path.display()
                    );
                }
                LabelDecision::NestedExport { label } => {
                    error!(
                        "'{}' looks like an Apple Mail export (label '{}'), which is not supported; convert it to a flat .mbox file",
                        path.display(),
                        label
                    );
                }
                LabelDecision::Unresolvable { entry } => {
                    error!("Labels under '{}' may not nest correctly", entry);
                }
            }
        }

        Ok(accumulator.into_result())
    }

    async fn import_label_file(
        &self,
        group_id: &str,
        label: &str,
        path: &Path,
        accumulator: &mut ImportAccumulator,
        resume: &mut ResumeTracker,
    ) -> Result<()> {
        info!("Starting processing of '{}'", path.display());
        let archive = MboxArchive::open(path)?;
        info!("Using label name '{}'", label);

        let total = archive.count()?;
        let start = resume.start_index(group_id, label);
        let uploader = MessageUploader::new(self.client);

        for message in archive.messages()? {
            let message = message?;
            if message.index < start {
                continue;
            }

            info!(
                "Processing message {}/{} in label '{}'",
                message.index, total, label
            );
            let outcome = uploader.upload(group_id, label, &message).await;
            accumulator.record_message(outcome.is_success());
            resume.advance(group_id, label, message.index + 1).await?;
        }

        let (_, tally) = accumulator.finish_label();
        resume.flush().await?;

        info!(
            "Finished processing '{}'. {} messages imported successfully, {} messages failed.",
            archive.path().display(),
            tally.successes,
            tally.failures
        );
        Ok(())
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub groups: Vec<(String, GroupResult)>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            groups: Vec::new(),
        }
    }

    pub fn record(&mut self, group: String, result: GroupResult) {
        self.groups.push((group, result));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn totals(&self) -> GroupResult {
        let mut totals = GroupResult::default();
        for (_, result) in &self.groups {
            totals += *result;
        }
        totals
    }

    pub fn result_for(&self, group: &str) -> Option<&GroupResult> {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, result)| result)
    }

    pub fn duration_seconds(&self) -> i64 {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
            .unwrap_or(0)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// List group directories directly under the import root, sorted by name
pub async fn discover_groups(root: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|e| ImportError::DirectoryError {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut groups = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        // Follows symlinks, so linked group directories are included
        match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Ignoring {:?} under the import root: {}", entry.path(), e);
                continue;
            }
        }
        match entry.file_name().into_string() {
            Ok(name) => groups.push(name),
            Err(name) => warn!("Ignoring group directory with non UTF-8 name {:?}", name),
        }
    }
    groups.sort();
    Ok(groups)
}

/// Drives the importer across every group under the import root
///
/// Any group-level error (missing group, unreadable archive) stops the run.
pub struct ImportRunner<'a, C: GroupsClient + ?Sized> {
    client: &'a C,
    settings: &'a ImportSettings,
}

impl<'a, C: GroupsClient + ?Sized> ImportRunner<'a, C> {
    pub fn new(client: &'a C, settings: &'a ImportSettings) -> Self {
        Self { client, settings }
    }

    /// Group directories that take part in this run
    pub async fn selected_groups(&self) -> Result<Vec<String>> {
        let mut groups = discover_groups(&self.settings.import_root).await?;
        groups.retain(|group| {
            let included = self.settings.includes_group(group);
            if !included {
                info!("Skipping group {} (not selected)", group);
            }
            included
        });

        if let Some(requested) = &self.settings.groups {
            for group in requested {
                if !groups.contains(group) {
                    warn!("Requested group {} has no directory under the import root", group);
                }
            }
        }

        Ok(groups)
    }

    async fn verify_one(&self, group: &str) -> Result<()> {
        match self.client.verify_group(group).await {
            Ok(()) => {
                info!("Successfully found group {}", group);
                Ok(())
            }
            Err(e) => {
                error!("Can't get group {}: {}", group, e);
                Err(e)
            }
        }
    }

    /// Import every selected group in order
    pub async fn run(&self) -> Result<RunReport> {
        let groups = self.selected_groups().await?;
        let mut resume = ResumeTracker::from_settings(self.settings).await?;
        let mut report = RunReport::new();
        let importer = GroupImporter::new(self.client, self.settings);

        for group in groups {
            info!("Processing group {}", group);
            self.verify_one(&group).await?;

            let result = match importer.import_group(&group, &mut resume).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Can't process mbox files for group {}: {}", group, e);
                    if let Err(flush_error) = resume.flush().await {
                        warn!("Could not save checkpoint after failure: {}", flush_error);
                    }
                    return Err(e);
                }
            };

            info!("Done importing group {}. {}", group, result);
            report.record(group, result);
        }

        report.finish();
        info!("Finished.");
        Ok(report)
    }

    /// Check every selected group exists without importing anything
    pub async fn verify(&self) -> Result<Vec<String>> {
        let groups = self.selected_groups().await?;
        for group in &groups {
            self.verify_one(group).await?;
        }
        Ok(groups)
    }
}
