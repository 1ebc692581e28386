use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stackctl")]
#[command(about = "Back up, restore and attach storage for deployed rollup stacks", long_about = None)]
pub(crate) struct Cli {
    /// Path to a config file (defaults to ./stackctl.toml, then the user config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Stack to operate on (overrides backup.stack_id)
    #[arg(short, long, global = true)]
    pub stack: Option<String>,

    /// Answer yes to confirmations
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show backup protection status
    Status,
    /// List recent checkpoints
    Checkpoints,
    /// Take a snapshot now
    Snapshot,
    /// Restore from a checkpoint
    Restore {
        /// Recovery point to restore from
        recovery_point_id: String,
        /// Reattach the restored storage to the stack's workloads
        #[arg(long)]
        attach: bool,
    },
    /// Attach storage to the stack's workloads
    Attach {
        /// Storage (file system) id to attach
        #[arg(long)]
        efs_id: Option<String>,
        /// Persistent volume claim to bind (repeatable)
        #[arg(long)]
        pvc: Vec<String>,
        /// Stateful workload to bind (repeatable)
        #[arg(long)]
        sts: Vec<String>,
        /// Skip the server-side filesystem backup (only after a local download)
        #[arg(long)]
        no_fs_backup: bool,
        /// Download a local filesystem backup to this path first
        #[arg(long, value_name = "PATH")]
        download: Option<PathBuf>,
    },
    /// Configure the daily backup schedule
    Schedule {
        /// Time of day, HH:MM (24h)
        #[arg(long)]
        daily: String,
        /// Retention in days
        #[arg(long)]
        keep: u32,
    },
    /// Download a local filesystem backup
    Export {
        /// Where to write the archive
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a default config file
    Config,
}
