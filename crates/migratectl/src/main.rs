//! Playbook migration command-line runner.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playbook_migrate::{MigrateConfig, Migrator, Settings};

#[derive(Parser)]
#[command(name = "migratectl")]
#[command(version, about = "Apply playbook-driven database migrations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $MIGRATE_CONFIG or config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Playbooks directory (default: $MIGRATE_PLAYBOOKS or playbooks)
    #[arg(short, long, global = true)]
    playbooks: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a playbook step against an environment
    ///
    /// Examples:
    ///     migratectl run dev app all
    ///     migratectl run prod app schema --config /etc/migrate/config.yml
    #[command(verbatim_doc_comment)]
    Run {
        /// Environment defined in the config file
        env: String,

        /// Playbook directory name
        playbook: String,

        /// Step to run
        step: String,
    },
    /// Show the resolved schedule for a step without running it
    Plan {
        /// Playbook directory name
        playbook: String,

        /// Step to resolve
        step: String,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,playbook_migrate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(0) => {}
        Ok(errors) => {
            eprintln!("Migration finished with {} error(s)", errors);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns the number of errors reported by the run.
async fn execute(cli: Cli) -> Result<usize> {
    let mut settings = Settings::from_env().context("Invalid MIGRATE_* environment variables")?;
    if let Some(config) = cli.config {
        settings.config = config;
    }
    if let Some(playbooks) = cli.playbooks {
        settings.playbooks = playbooks;
    }
    tracing::debug!(
        config = %settings.config.display(),
        playbooks = %settings.playbooks.display(),
        "Settings loaded"
    );

    match cli.command {
        Commands::Run { env, playbook, step } => {
            let migrator = Migrator::from_settings(&settings)
                .await
                .with_context(|| format!("Failed to load {}", settings.config.display()))?;
            let report = migrator.run(&env, &playbook, &step).await?;
            println!(
                "Applied {} action(s) across {} script(s), {} error(s){}",
                report.applied,
                report.entries,
                report.errors,
                if report.aborted { " (aborted)" } else { "" }
            );
            Ok(report.errors)
        }
        Commands::Plan { playbook, step } => {
            let migrator = Migrator::new(MigrateConfig::default(), settings.playbooks);
            let schedule = migrator.plan(&playbook, &step).await?;
            for (idx, entry) in schedule.iter().enumerate() {
                let actions: Vec<&str> = entry.actions.iter().map(|a| a.as_str()).collect();
                println!("{:>3}. {} [{}]", idx + 1, entry.script, actions.join(", "));
            }
            Ok(0)
        }
    }
}
