pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::GatewayClient;

#[derive(Parser)]
#[command(name = "logctl")]
#[command(about = "logctl - Command-line client for the log gateway external access API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "LOGCTL_SERVER",
        default_value = "http://localhost:3000",
        help = "Gateway base URL"
    )]
    pub server: String,

    #[arg(long, global = true, env = "LOGCTL_USER", help = "External user sent in the User header")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Call an internal API through the external dispatch proxy")]
    Proxy(commands::proxy::ProxyArgs),

    #[command(about = "List spaces the external user is authorized in")]
    Spaces,

    #[command(about = "Deliver an approval result for a permission application")]
    Callback(commands::callback::CallbackArgs),

    #[command(about = "Check gateway health from the /health endpoint")]
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
    let client = GatewayClient::new(&cli.server, cli.user.clone())?;

    match cli.command {
        Commands::Proxy(args) => commands::proxy::handle(&client, args, output_format).await,
        Commands::Spaces => commands::spaces::handle(&client, output_format).await,
        Commands::Callback(args) => commands::callback::handle(&client, args, output_format).await,
        Commands::Health => commands::health::handle(&client, output_format).await,
    }
}
