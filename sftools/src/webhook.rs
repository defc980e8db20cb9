use std::fs;

use anyhow::{anyhow, Result};
use chrono::Utc;
use stripe_tools::webhook::{sign_payload, SIGNATURE_HEADER};

use crate::SignWebhookParams;

/// Signs the payload file the way Stripe would, so a local server can be exercised with `curl`.
pub fn print_webhook_signature(params: SignWebhookParams) -> Result<()> {
    let payload = fs::read(&params.payload).map_err(|e| anyhow!("Could not read {}. {e}", params.payload.display()))?;
    serde_json::from_slice::<serde_json::Value>(&payload)
        .map_err(|e| anyhow!("{} is not valid JSON. {e}", params.payload.display()))?;
    let timestamp = params.timestamp.unwrap_or_else(|| Utc::now().timestamp());
    let header = sign_payload(&payload, &params.secret, timestamp)?;
    println!("{SIGNATURE_HEADER}: {header}");
    if let Some(server) = params.server {
        println!();
        println!(
            "curl -X POST {}/stripe/webhook -H 'Content-Type: application/json' -H '{SIGNATURE_HEADER}: {header}' \
             --data-binary @{}",
            server.trim_end_matches('/'),
            params.payload.display()
        );
    }
    Ok(())
}
