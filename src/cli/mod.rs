//! Command-line interface.

mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sitewatch::Config;

use watch::{cmd_add, cmd_check, cmd_list, cmd_remove, cmd_run};

#[derive(Parser)]
#[command(name = "sitewatch")]
#[command(about = "Get notified when a web page's visible text changes", long_about = None)]
pub(crate) struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch every listed page until interrupted
    Run {
        /// Re-check interval (e.g. 1h, 5m, 90s); defaults to the configured value
        #[arg(short, long)]
        interval: Option<String>,
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },
    /// Add a page to the watch list
    Add {
        /// URL to watch
        url: String,
    },
    /// Remove a page from the watch list and forget its snapshot
    Remove {
        /// URL to stop watching
        url: String,
    },
    /// Show the watch list
    List,
    /// Check every page once and print what changed
    Check,
    /// Show version information
    Version,
}

impl Cli {
    pub(crate) async fn dispatch(self) -> Result<()> {
        let command = match self.command {
            Some(Commands::Version) | None => {
                println!("sitewatch {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            Some(command) => command,
        };

        let config = Config::load().with_context(|| "Failed to load configuration")?;
        match command {
            Commands::Run { interval, once } => cmd_run(config, interval, once).await,
            Commands::Add { url } => cmd_add(config, url).await,
            Commands::Remove { url } => cmd_remove(config, url).await,
            Commands::List => cmd_list(config).await,
            Commands::Check => cmd_check(config).await,
            Commands::Version => Ok(()),
        }
    }
}
