use clap::{Args, ValueEnum};
use serde_json::json;

use crate::cli::client::GatewayClient;
use crate::cli::utils::{output_reply, output_success};
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Args, Debug)]
pub struct CallbackArgs {
    #[arg(help = "Application serial number")]
    pub sn: String,

    #[arg(value_enum, help = "Approval result")]
    pub decision: Decision,

    #[arg(long, help = "Workflow status reported alongside the result")]
    pub current_status: Option<String>,
}

pub async fn handle(client: &GatewayClient, args: CallbackArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = json!({
        "sn": args.sn,
        "approve_result": args.decision == Decision::Approve,
        "current_status": args.current_status,
    });

    let reply = client.post_json("/external/callback/", &body).await?;
    output_reply(output_format, &reply, |_| {})?;
    if output_format == OutputFormat::Text {
        output_success(output_format, reply.message(), None)?;
    }
    Ok(())
}
