use serde_json::{json, Value};

use crate::cli::client::GatewayReply;
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "result": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a gateway reply: the raw body for JSON output, a summary otherwise.
/// A failed reply turns into an error so the process exits non-zero.
pub fn output_reply<F>(output_format: OutputFormat, reply: &GatewayReply, render: F) -> anyhow::Result<()>
where
    F: FnOnce(&Value),
{
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reply.body)?),
        OutputFormat::Text if reply.is_success() => render(reply.body.get("data").unwrap_or(&reply.body)),
        OutputFormat::Text => {}
    }

    if !reply.is_success() {
        return Err(anyhow::anyhow!("{} ({})", reply.message(), reply.status));
    }
    Ok(())
}

/// Render a list of JSON objects as aligned columns
pub fn print_table(rows: &[Value], columns: &[&str]) {
    if rows.is_empty() {
        println!("(none)");
        return;
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell(row.get(*c))).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| cells.iter().map(|r| r[i].len()).chain([c.len()]).max().unwrap_or(0))
        .collect();

    let line = |values: Vec<String>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(columns.iter().map(|c| c.to_uppercase()).collect()));
    for row in cells {
        println!("{}", line(row));
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_strings_bare() {
        assert_eq!(cell(Some(&json!("bkcc__2"))), "bkcc__2");
        assert_eq!(cell(Some(&json!(7))), "7");
        assert_eq!(cell(Some(&Value::Null)), "-");
        assert_eq!(cell(None), "-");
    }
}
