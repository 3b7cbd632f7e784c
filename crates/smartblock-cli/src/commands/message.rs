//! Message command - raw request/response protocol

use anyhow::{Context, Result};
use clap::Args;
use smartblock_core::{Config, Request};
use std::io::Read;

use crate::args::Args as GlobalArgs;
use crate::context::AppContext;

/// Message command arguments
#[derive(Args, Debug)]
pub struct MessageArgs {
    /// JSON request, e.g. '{"type":"getPerformanceStats"}'; reads stdin when omitted or "-"
    pub request: Option<String>,
}

/// Execute message command
pub async fn execute(args: &MessageArgs, global: &GlobalArgs, config: Config) -> Result<()> {
    let raw = match args.request.as_deref() {
        Some("-") | None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Failed to read request from stdin")?;
            buf
        }
        Some(text) => text.to_string(),
    };

    let request: Request = serde_json::from_str(raw.trim()).context("Malformed request")?;
    let ctx = AppContext::prepared(global, config).await?;

    let response = ctx.service.handle(request).await;
    ctx.finish().await;

    println!("{}", serde_json::to_string(&response).context("Failed to serialize response")?);
    Ok(())
}
