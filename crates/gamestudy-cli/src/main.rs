use clap::{Parser, Subcommand};
use gamestudy_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "gamestudy", version, about = "GameStudy: gamified Pomodoro study tracker")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Study task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Daily study goal
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Experience points and level
    Xp {
        #[command(subcommand)]
        action: commands::xp::XpAction,
    },
    /// One-shot XP quests
    Quest {
        #[command(subcommand)]
        action: commands::quest::QuestAction,
    },
    /// Pomodoro timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Stored data management
    Data {
        #[command(subcommand)]
        action: commands::data::DataAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("GAMESTUDY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    init_tracing(&config);

    let ctx = Context::new(config, cli.json);
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, &ctx),
        Commands::Goal { action } => commands::goal::run(action, &ctx),
        Commands::Xp { action } => commands::xp::run(action, &ctx),
        Commands::Quest { action } => commands::quest::run(action, &ctx),
        Commands::Timer { action } => commands::timer::run(action, &ctx).await,
        Commands::Data { action } => commands::data::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action, &ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
