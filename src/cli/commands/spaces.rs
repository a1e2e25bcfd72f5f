use crate::cli::client::GatewayClient;
use crate::cli::utils::{output_reply, print_table};
use crate::cli::OutputFormat;

pub async fn handle(client: &GatewayClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let reply = client.get("/external/spaces/").await?;
    output_reply(output_format, &reply, |data| {
        let rows = data.as_array().cloned().unwrap_or_default();
        print_table(&rows, &["space_uid", "space_name", "space_type_name", "time_zone"]);
    })
}
