//! Broadcast to one or more groups.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Args;
use console_api::{MessageContent, SendMessageRequest};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Target group id (repeatable)
    #[arg(short, long = "group", value_name = "GROUP_ID")]
    pub groups: Vec<u64>,

    /// Text item (repeatable, sent in order)
    #[arg(short, long)]
    pub text: Vec<String>,

    /// Image file or http(s) URL (repeatable, sent after the text)
    #[arg(short, long, value_name = "PATH_OR_URL")]
    pub image: Vec<String>,

    /// Mention everyone
    #[arg(long)]
    pub at_all: bool,

    /// Mark the message as essence
    #[arg(long)]
    pub essence: bool,

    /// Also post as a group announcement (one image at most)
    #[arg(long)]
    pub announcement: bool,
}

pub async fn send(ctx: &Context, args: SendArgs) -> Result<()> {
    let api = ctx.authenticated_api()?;
    let request = build_request(args)?;
    let groups = request.group_ids.len();

    let result = api.send_message(request).await?;

    match ctx.format {
        OutputFormat::Text => println!("Message sent to {} group(s)", groups),
        OutputFormat::Json => output::print_json(&result),
    }
    Ok(())
}

fn build_request(args: SendArgs) -> Result<SendMessageRequest> {
    let mut request = SendMessageRequest::new(args.groups)
        .at_all(args.at_all)
        .set_essence(args.essence)
        .set_announcement(args.announcement);

    for text in args.text {
        request = request.push(MessageContent::text(text));
    }
    for image in &args.image {
        request = request.push(MessageContent::image(image_content(image)?));
    }

    Ok(request)
}

/// Remote URLs are passed through; local files become data URLs.
fn image_content(source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(source.to_string());
    }

    let path = Path::new(source);
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Encoded image");
    Ok(format!("data:{};base64,{}", mime_type(path), STANDARD.encode(bytes)))
}

fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/png",
    }
}
