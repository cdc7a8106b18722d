mod cmd;
mod engine;
mod output;
mod root;
mod sink;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, deferred::DeferredSubcommand, policy::PolicySubcommand,
    post::PostArgs,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hush",
    about = "Hold back app notifications outside their allowed hours and release them later",
    version,
    propagate_version = true
)]
struct Cli {
    /// Root directory holding .hush/ (default: auto-detect upward from cwd)
    #[arg(long, global = true, env = "HUSH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize hush in the current directory
    Init {
        /// App id of the engine itself; its notifications are never filtered
        #[arg(long)]
        self_app_id: Option<String>,
    },

    /// Manage per-app time-window policies
    Policy {
        #[command(subcommand)]
        subcommand: PolicySubcommand,
    },

    /// Inspect or clear queued notifications
    Deferred {
        #[command(subcommand)]
        subcommand: DeferredSubcommand,
    },

    /// List installed apps with their policy and queue length
    Apps,

    /// Post one notification through the filter
    Post {
        app_id: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Live notification key (default: generated)
        #[arg(long)]
        key: Option<String>,
        /// Local arrival time, YYYY-MM-DDTHH:MM (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Run one release tick now
    Release {
        /// Local time to evaluate windows at, YYYY-MM-DDTHH:MM (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Filter notifications from stdin and release queues on a schedule
    Daemon {
        /// Stop when stdin closes instead of waiting for Ctrl-C
        #[arg(long)]
        exit_on_eof: bool,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Daemon { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { self_app_id } => cmd::init::run(&root, self_app_id.as_deref()),
        Commands::Policy { subcommand } => cmd::policy::run(&root, subcommand, cli.json),
        Commands::Deferred { subcommand } => cmd::deferred::run(&root, subcommand, cli.json),
        Commands::Apps => cmd::apps::run(&root, cli.json),
        Commands::Post {
            app_id,
            title,
            body,
            key,
            at,
        } => cmd::post::run(
            &root,
            PostArgs {
                app_id,
                title,
                body,
                key,
                at,
            },
            cli.json,
        ),
        Commands::Release { at } => cmd::release::run(&root, at.as_deref(), cli.json),
        Commands::Daemon { exit_on_eof } => cmd::daemon::run(&root, exit_on_eof),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
