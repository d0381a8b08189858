//! Command-line interface

use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth;
use crate::client::ProductionGroupsClient;
use crate::config::Config;
use crate::error::Result;
use crate::importer::{ImportRunner, RunReport};
use crate::settings::ImportSettings;

#[derive(Parser, Debug)]
#[command(name = "mbox-group-import")]
#[command(version)]
#[command(about = "Import mbox files into Google Groups archives", long_about = None)]
#[command(after_help = "\
The directory needs a subdirectory for each group, named with the group's
full email address, holding one .mbox file per label:

    <dir>/<group@domain.com>/<label>.mbox

Subdirectories below the group directory become nested label segments.")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "mbox-group-import.toml")]
    pub config: PathBuf,

    /// Path to the log file (default: mbox-group-import-<pid>.log)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to read archives from and whom to act as
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding one subdirectory of mbox files per group
    #[arg(long)]
    pub dir: PathBuf,

    /// Path to the service account JSON key file
    #[arg(long)]
    pub json: PathBuf,

    /// Email address of the groups' owner, impersonated by the service account
    #[arg(long)]
    pub group_owner: String,

    /// Only process these groups (comma separated directory names)
    #[arg(long, value_delimiter = ',')]
    pub groups: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import every mbox file into its group
    Import {
        #[command(flatten)]
        source: SourceArgs,

        /// Message number to resume from; affects ALL groups and ALL mbox files
        #[arg(long, default_value_t = 0)]
        from_message: usize,

        /// Track progress per mbox file in this checkpoint file and resume from it
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Check that every group directory maps to an existing group
    Verify {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "mbox-group-import.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

/// Merge command-line arguments with the config file into run settings
pub fn build_settings(
    source: &SourceArgs,
    from_message: usize,
    checkpoint: Option<PathBuf>,
    config: &Config,
) -> ImportSettings {
    let settings = ImportSettings::new(&source.dir, source.group_owner.clone())
        .with_from_message(from_message)
        .with_groups(source.groups.clone());

    match checkpoint {
        Some(path) => settings.with_checkpoint(path, config.import.checkpoint_interval),
        None => settings,
    }
}

async fn connect(
    source: &SourceArgs,
    config: &Config,
    reporter: &ProgressReporter,
) -> Result<ProductionGroupsClient> {
    let key_spinner = reporter.add_spinner("Reading service account key...");
    let key = auth::load_key_summary(&source.json).await?;
    reporter.finish_spinner(&key_spinner, &format!("Service account {}", key.client_email));

    let auth_spinner = reporter.add_spinner("Authenticating with Google Groups APIs...");
    let hubs =
        auth::initialize_groups_hubs(&source.json, &source.group_owner, &config.api.user_agent)
            .await?;
    reporter.finish_spinner(
        &auth_spinner,
        &format!("Authenticated on behalf of {}", source.group_owner),
    );

    Ok(ProductionGroupsClient::new(hubs))
}

/// Authenticate, then import every selected group
pub async fn run_import(
    source: &SourceArgs,
    from_message: usize,
    checkpoint: Option<PathBuf>,
    config: &Config,
    multi: MultiProgress,
) -> Result<RunReport> {
    let reporter = ProgressReporter::with_multi_progress(multi);
    let settings = build_settings(source, from_message, checkpoint, config);
    let client = connect(source, config, &reporter).await?;

    ImportRunner::new(&client, &settings).run().await
}

/// Authenticate, then confirm every selected group exists
pub async fn run_verify(
    source: &SourceArgs,
    config: &Config,
    multi: MultiProgress,
) -> Result<Vec<String>> {
    let reporter = ProgressReporter::with_multi_progress(multi);
    let settings = build_settings(source, 0, None, config);
    let client = connect(source, config, &reporter).await?;

    ImportRunner::new(&client, &settings).verify().await
}

/// Human-readable end-of-run summary
pub fn format_summary(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("\n========================================\n");
    out.push_str("Import Summary\n");
    out.push_str("========================================\n");
    for (group, result) in &report.groups {
        out.push_str(&format!("{}\n  {}\n", group, result));
    }
    if report.groups.is_empty() {
        out.push_str("No groups were imported.\n");
    }
    out.push_str("----------------------------------------\n");
    out.push_str(&format!("Total: {}\n", report.totals()));
    out.push_str(&format!("Duration: {} seconds\n", report.duration_seconds()));
    out.push_str("========================================");
    out
}
