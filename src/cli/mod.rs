use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod config;
pub mod init_config;
pub mod logging;
pub mod proposals;
pub mod serve;
pub mod snapshot;
pub mod version;

use config::DegovConfig;
use proposals::DEFAULT_DURATION_HOURS;

#[derive(Parser)]
#[command(name = "degov")]
#[command(author = "degov Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the degov proposal and vote store", long_about = None)]
pub struct Cli {
    /// Path to config file (default: config.toml next to the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding proposal records (overrides storage.data_dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new proposal
    Create {
        /// Proposal title
        #[arg(long)]
        title: String,

        /// Longer description (defaults to the title)
        #[arg(long)]
        description: Option<String>,

        /// Voting option; repeat for each (default: For, Against)
        #[arg(long = "option")]
        options: Vec<String>,

        /// Voting window in hours
        #[arg(long, default_value_t = DEFAULT_DURATION_HOURS)]
        duration_hours: u64,

        /// Creator recorded on the proposal
        #[arg(long, default_value = "operator")]
        creator: String,
    },

    /// Cast a vote on an active proposal
    Vote {
        /// Proposal id
        proposal_id: u64,

        /// Option label, exactly as listed on the proposal
        option: String,

        /// Voter identity
        #[arg(long)]
        voter: String,
    },

    /// Show a proposal and its results
    Show {
        /// Proposal id
        proposal_id: u64,
    },

    /// List active proposals
    List,

    /// Print a proposal's tally as JSON
    Results {
        /// Proposal id
        proposal_id: u64,
    },

    /// Close a proposal to further voting
    Close {
        /// Proposal id
        proposal_id: u64,
    },

    /// Export all proposals to a sealed snapshot file
    Export {
        /// Output path for the snapshot file
        #[arg(long)]
        output: PathBuf,
    },

    /// Import proposals from a sealed snapshot file
    Import {
        /// Snapshot file to read
        #[arg(long)]
        input: PathBuf,
    },

    /// Serve JSON-lines requests on stdin/stdout
    Serve,

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match cli.command {
        Commands::Version => {
            version::execute();
            return Ok(());
        }
        Commands::InitConfig { force } => {
            return init_config::execute(cli.config, cli.data_dir, force);
        }
        _ => DegovConfig::resolve(cli.config.as_deref(), cli.data_dir.as_deref())?,
    };

    logging::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Create {
            title,
            description,
            options,
            duration_hours,
            creator,
        } => {
            proposals::create(&config, title, description, options, duration_hours, creator).await
        }
        Commands::Vote {
            proposal_id,
            option,
            voter,
        } => proposals::vote(&config, proposal_id, option, voter).await,
        Commands::Show { proposal_id } => proposals::show(&config, proposal_id).await,
        Commands::List => proposals::list(&config).await,
        Commands::Results { proposal_id } => proposals::results(&config, proposal_id).await,
        Commands::Close { proposal_id } => proposals::close(&config, proposal_id).await,
        Commands::Export { output } => snapshot::export(&config, output).await,
        Commands::Import { input } => snapshot::import(&config, input).await,
        Commands::Serve => serve::execute(&config).await,
        Commands::Version | Commands::InitConfig { .. } => Ok(()),
    }
}
