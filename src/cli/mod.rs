pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse CLI - drive the admin console core from a terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Login, logout and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Inspect and reload permission-driven routes")]
    Routes {
        #[command(subcommand)]
        cmd: commands::routes::RoutesCommands,
    },

    #[command(about = "Navigate to a path through the route guard")]
    Open {
        #[arg(help = "Target path, e.g. /system/user")]
        path: String,
    },

    #[command(about = "Open tabs and their page cache")]
    Tabs {
        #[command(subcommand)]
        cmd: commands::tabs::TabsCommands,
    },

    #[command(about = "Theme presets and color variants")]
    Theme {
        #[command(subcommand)]
        cmd: commands::theme::ThemeCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Routes { cmd } => commands::routes::handle(cmd, output_format).await,
        Commands::Open { path } => commands::open::handle(path, output_format).await,
        Commands::Tabs { cmd } => commands::tabs::handle(cmd, output_format).await,
        Commands::Theme { cmd } => commands::theme::handle(cmd, output_format).await,
    }
}
