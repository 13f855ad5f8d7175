//! Group listing and history.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use console_api::ChatMessage;

pub async fn groups_list(ctx: &Context) -> Result<()> {
    let groups = ctx.authenticated_api()?.groups().await?;

    match ctx.format {
        OutputFormat::Text => {
            if groups.is_empty() {
                println!("The bot is not in any group");
                return Ok(());
            }

            output::print_heading(&format!("Groups ({})", groups.len()));
            println!("  {:<14} {:>8}  NAME", "ID", "MEMBERS");
            for group in &groups {
                println!(
                    "  {:<14} {:>8}  {}",
                    group.group_id,
                    group.group_member_count,
                    output::truncate(&group.group_name, 40)
                );
            }
        }
        OutputFormat::Json => output::print_json(&groups),
    }

    Ok(())
}

/// Print the recent messages of one group, oldest first.
pub async fn history(ctx: &Context, group_id: &str) -> Result<()> {
    let messages = ctx.authenticated_api()?.group_messages(group_id).await?;

    match ctx.format {
        OutputFormat::Text => {
            if messages.is_empty() {
                println!("No messages in group {}", group_id);
                return Ok(());
            }
            output::print_heading(&format!("Group {}", group_id));
            for message in &messages {
                println!("{}", format_message(message));
            }
        }
        OutputFormat::Json => output::print_json(&messages),
    }

    Ok(())
}

/// One-line rendering shared by `history` and `watch`.
pub(crate) fn format_message(message: &ChatMessage) -> String {
    let sender = if message.nickname.is_empty() {
        message.user_id.as_str()
    } else {
        message.nickname.as_str()
    };
    format!("[{}] {}: {}", message.timestamp, sender, message.content)
}
