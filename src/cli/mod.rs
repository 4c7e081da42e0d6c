use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally::ledger::FileLedger;
use tally::poll::VoterId;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod duration;
pub mod polls;
pub mod version;

use config::{default_config_path, default_ledger_path, TallyConfig};
use polls::Session;

#[derive(Parser)]
#[command(name = "tally")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the tally poll ledger", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.local/share/tally/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Identity to register as administrator
        #[arg(long)]
        admin: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create a new poll
    Create {
        /// Poll question
        #[arg(long)]
        title: String,

        /// Answer option (repeat 2 to 10 times)
        #[arg(long = "option", required = true)]
        options: Vec<String>,

        /// How long voting stays open (e.g., 3600, 90m, 24h, 7d)
        #[arg(long, default_value = "24h")]
        duration: String,

        /// Identity creating the poll
        #[arg(long = "as", value_name = "IDENTITY")]
        identity: String,
    },

    /// Cast a vote
    Vote {
        /// Poll id
        poll_id: u64,

        /// Option index (0-based)
        #[arg(long)]
        option: usize,

        /// Identity casting the vote
        #[arg(long = "as", value_name = "IDENTITY")]
        identity: String,
    },

    /// Close a poll and reveal its results
    Close {
        /// Poll id
        poll_id: u64,

        /// Identity closing the poll
        #[arg(long = "as", value_name = "IDENTITY")]
        identity: String,
    },

    /// Show one poll
    Show {
        /// Poll id
        poll_id: u64,

        /// Identity to report voting status for
        #[arg(long = "as", value_name = "IDENTITY")]
        identity: Option<String>,
    },

    /// List all polls
    List {
        /// Identity to report voting status for
        #[arg(long = "as", value_name = "IDENTITY")]
        identity: Option<String>,
    },

    /// Display version information
    Version,
}

/// Install the tracing subscriber. `RUST_LOG` wins over the config level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let output = match cli.command {
        Commands::Version => {
            version::execute();
            return Ok(());
        }
        Commands::Init { admin, force } => return init(&config_path, admin, force),
        Commands::Create {
            title,
            options,
            duration,
            identity,
        } => {
            open_session(&config_path)
                .await?
                .create(&title, &options, &duration, &VoterId::new(identity))
                .await?
        }
        Commands::Vote {
            poll_id,
            option,
            identity,
        } => {
            open_session(&config_path)
                .await?
                .vote(poll_id, option, &VoterId::new(identity))
                .await?
        }
        Commands::Close { poll_id, identity } => {
            open_session(&config_path)
                .await?
                .close(poll_id, &VoterId::new(identity))
                .await?
        }
        Commands::Show { poll_id, identity } => open_session(&config_path)
            .await?
            .show(poll_id, identity.map(VoterId::new).as_ref())?,
        Commands::List { identity } => open_session(&config_path)
            .await?
            .list(identity.map(VoterId::new).as_ref()),
    };

    println!("{}", output.trim_end());
    Ok(())
}

/// Load config (creating a default if missing), start logging, open the ledger.
async fn open_session(
    config_path: &std::path::Path,
) -> Result<Session<FileLedger>, Box<dyn std::error::Error>> {
    let (config, created) = TallyConfig::load_or_create(config_path)?;
    init_logging(&config.logging.level);
    if created {
        tracing::info!(config = %config_path.display(), "created default configuration");
    }
    Session::from_config(&config).await
}

fn init(
    config_path: &std::path::Path,
    admin: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    let ledger_path = default_ledger_path(config_path);
    match admin {
        Some(admin) => {
            let mut config = TallyConfig::new(ledger_path.clone());
            config.access.administrators = vec![admin];
            config.save(config_path)?;
        }
        None => TallyConfig::create_default(config_path, &ledger_path)?,
    }

    println!("Created: {}", config_path.display());
    println!("Ledger: {}", ledger_path.display());
    Ok(())
}
