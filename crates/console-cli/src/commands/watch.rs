//! Live view of one or more groups over the realtime connection.

use super::groups::format_message;
use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{anyhow, Result};
use console_realtime::{ChatMessage, LifecycleCallbacks, RealtimeClient, RealtimeEvent};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Stream messages of `groups` until Ctrl-C or until reconnecting gives up.
///
/// Reconnect attempts re-read the stored token, so logging in again from
/// another terminal repairs a rejected credential without restarting.
pub async fn watch(ctx: &Context, groups: Vec<String>) -> Result<()> {
    if groups.is_empty() {
        anyhow::bail!("Give at least one group id to watch");
    }

    let store = ctx.token_store();
    let token = store
        .load()?
        .ok_or_else(|| anyhow!("Not logged in. Run 'botconsole login' first"))?;

    let client = RealtimeClient::with_websocket(ctx.realtime_config())?;
    let source = store.clone();
    client
        .set_credential_source(Arc::new(move || source.load().ok().flatten()))
        .await;

    let format = ctx.format;
    for group_id in &groups {
        let group = group_id.clone();
        client
            .subscribe_to_group(group_id, move |message| {
                print_message(&group, message, format)
            })
            .await;
    }

    let events = client.events();
    let callbacks = LifecycleCallbacks::new()
        .on_open(move || print_status("connected", format))
        .on_close(move || print_status("disconnected", format));

    info!(groups = ?groups, endpoint = %client.endpoint(), "Watching groups");
    if format == OutputFormat::Text {
        println!("Watching {} group(s), press Ctrl-C to stop", groups.len());
    }
    client.connect(&token, callbacks).await;

    let ctrl_c = tokio::signal::ctrl_c();

    let result = tokio::select! {
        result = follow_events(events, format) => result,
        _ = ctrl_c => {
            info!("Received shutdown signal, disconnecting...");
            Ok(())
        }
    };

    client.disconnect().await;
    result
}

/// Report reconnect progress; returns once the client gives up.
async fn follow_events(
    mut events: tokio::sync::broadcast::Receiver<RealtimeEvent>,
    format: OutputFormat,
) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(RealtimeEvent::ReconnectScheduled { attempt, delay }) => match format {
                OutputFormat::Text => {
                    println!("  reconnecting in {}s (attempt {})", delay.as_secs(), attempt)
                }
                OutputFormat::Json => output::print_json_line(&json!({
                    "event": "reconnect_scheduled",
                    "attempt": attempt,
                    "delay_ms": delay.as_millis() as u64,
                })),
            },
            Ok(RealtimeEvent::GaveUp { attempts }) => {
                return Err(anyhow!(
                    "Connection lost, gave up after {} reconnect attempts",
                    attempts
                ));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed realtime events"),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

fn print_message(group_id: &str, message: &ChatMessage, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            let time = chrono::Local::now().format("%H:%M:%S");
            println!("{} #{} {}", time, group_id, format_message(message));
        }
        OutputFormat::Json => output::print_json_line(&json!({
            "event": "message",
            "group_id": group_id,
            "message": message,
        })),
    }
}

fn print_status(status: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("  {}", status),
        OutputFormat::Json => output::print_json_line(&json!({ "event": status })),
    }
}
