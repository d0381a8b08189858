use anyhow::Result;
use clap::Parser;
use indicatif::MultiProgress;
use mbox_group_import::cli::{self, Cli, Commands};
use mbox_group_import::config::Config;
use mbox_group_import::error::ImportError;
use mbox_group_import::logging;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        display_error(&e);
        eprintln!("\nFor help, run: mbox-group-import --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs; on Windows, use ring
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    if let Commands::InitConfig { output, force } = &cli.command {
        if output.exists() && !force {
            return Err(ImportError::ConfigError(format!(
                "Configuration file already exists at {:?}. Use --force to overwrite.",
                output
            ))
            .into());
        }
        Config::create_example(output).await?;
        println!("Created example configuration file at: {:?}", output);
        return Ok(());
    }

    let (config, config_origin) = Config::load(&cli.config).await?;

    // Logs print above any active spinners
    let multi_progress = Arc::new(MultiProgress::new());
    let log_path = cli.log.clone().unwrap_or_else(logging::default_log_path);
    logging::init(
        &log_path,
        &config.logging,
        cli.verbose,
        Arc::clone(&multi_progress),
    )?;

    tracing::info!("Logging to {:?}", log_path);
    config_origin.log();

    match cli.command {
        Commands::Import {
            source,
            from_message,
            checkpoint,
        } => {
            let report = cli::run_import(
                &source,
                from_message,
                checkpoint,
                &config,
                (*multi_progress).clone(),
            )
            .await?;

            println!("{}", cli::format_summary(&report));
            Ok(())
        }

        Commands::Verify { source } => {
            let groups = cli::run_verify(&source, &config, (*multi_progress).clone()).await?;

            println!("Verified {} groups:", groups.len());
            for group in groups {
                println!("  - {}", group);
            }
            Ok(())
        }

        Commands::InitConfig { .. } => Ok(()),
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(import_err) = error.downcast_ref::<ImportError>() {
        match import_err {
            ImportError::AuthError(_) | ImportError::Forbidden(_) => {
                eprintln!("\nHint: Check that the JSON key belongs to a service account with");
                eprintln!("      domain-wide delegation for the Groups Migration and Groups");
                eprintln!("      Settings scopes, and that --group-owner can manage the groups.");
            }
            ImportError::GroupNotFound(_) => {
                eprintln!("\nHint: Group directory names must be the group's full email address.");
            }
            ImportError::ArchiveError { .. } => {
                eprintln!("\nHint: Fix or remove the unreadable mbox file, then resume with");
                eprintln!("      --from-message or --checkpoint.");
            }
            _ => {}
        }
    }
}
