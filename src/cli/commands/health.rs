use crate::cli::client::GatewayClient;
use crate::cli::utils::output_reply;
use crate::cli::OutputFormat;

pub async fn handle(client: &GatewayClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let reply = client.get("/health").await?;
    output_reply(output_format, &reply, |data| {
        let status = data.get("status").and_then(|s| s.as_str()).unwrap_or("unknown");
        println!("✓ gateway {} ({})", status, client.endpoint("/").map(|u| u.to_string()).unwrap_or_default());
    })
}
