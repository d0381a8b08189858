//! Immutable run configuration handed to the importer

use std::path::PathBuf;

use crate::config::Config;

/// Everything the import pipeline needs to know about one run
///
/// Built once from the command line and the config file, then passed by
/// reference.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Directory holding one subdirectory per group
    pub import_root: PathBuf,
    /// Principal the service account impersonates
    pub group_owner: String,
    /// Messages whose index within their own file is below this are
    /// skipped, in every file of every group
    pub from_message: usize,
    /// Per-file checkpoint; files with an entry resume from it instead of
    /// `from_message`
    pub checkpoint_path: Option<PathBuf>,
    /// Attempted messages between checkpoint saves
    pub checkpoint_interval: usize,
    /// Restrict the run to these group directories
    pub groups: Option<Vec<String>>,
}

impl ImportSettings {
    pub fn new(import_root: impl Into<PathBuf>, group_owner: impl Into<String>) -> Self {
        Self {
            import_root: import_root.into(),
            group_owner: group_owner.into(),
            from_message: 0,
            checkpoint_path: None,
            checkpoint_interval: Config::default().import.checkpoint_interval,
            groups: None,
        }
    }

    pub fn with_from_message(mut self, from_message: usize) -> Self {
        self.from_message = from_message;
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>, interval: usize) -> Self {
        self.checkpoint_path = Some(path.into());
        self.checkpoint_interval = interval.max(1);
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = if groups.is_empty() { None } else { Some(groups) };
        self
    }

    /// Whether the group directory named `group` takes part in this run
    pub fn includes_group(&self, group: &str) -> bool {
        match &self.groups {
            Some(groups) => groups.iter().any(|g| g == group),
            None => true,
        }
    }

    /// Base directory for one group
    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.import_root.join(group)
    }
}
