use clap::Args;
use serde_json::{json, Value};

use crate::cli::client::GatewayClient;
use crate::cli::utils::output_reply;
use crate::cli::OutputFormat;

#[derive(Args, Debug)]
pub struct ProxyArgs {
    #[arg(help = "Internal API path, e.g. /api/v1/search/index_set/")]
    pub url: String,

    #[arg(short = 'X', long, default_value = "GET", help = "GET or POST")]
    pub method: String,

    #[arg(long, env = "LOGCTL_SPACE_UID", help = "Space to act in")]
    pub space_uid: Option<String>,

    #[arg(short, long, help = "JSON body forwarded as the request data")]
    pub data: Option<String>,
}

pub async fn handle(client: &GatewayClient, args: ProxyArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let data: Value = match &args.data {
        Some(raw) => serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("--data is not valid JSON: {}", e))?,
        None => json!({}),
    };

    let body = json!({
        "url": args.url,
        "method": args.method,
        "space_uid": args.space_uid.unwrap_or_default(),
        "data": data,
    });

    let reply = client.post_json("/external/dispatch/", &body).await?;
    output_reply(output_format, &reply, |data| match serde_json::to_string_pretty(data) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", data),
    })
}
