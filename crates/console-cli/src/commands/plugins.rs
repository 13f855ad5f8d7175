//! Plugin management commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

pub async fn plugins_list(ctx: &Context) -> Result<()> {
    let plugins = ctx.authenticated_api()?.plugins().await?;

    match ctx.format {
        OutputFormat::Text => {
            if plugins.is_empty() {
                println!("No plugins installed");
                return Ok(());
            }
            output::print_heading(&format!("Plugins ({})", plugins.len()));
            for plugin in &plugins {
                println!("  {:<24} {}", plugin.id, plugin.name);
            }
        }
        OutputFormat::Json => output::print_json(&plugins),
    }

    Ok(())
}

pub async fn plugins_show(ctx: &Context, id: &str) -> Result<()> {
    let plugin = ctx.authenticated_api()?.plugin_config(id).await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_heading(&format!("{} ({})", plugin.name, plugin.id));
            if let Some(description) = &plugin.description {
                println!("{}", description);
            }
            if let Some(can_reload) = plugin.can_reload {
                output::print_row("Reloadable", if can_reload { "yes" } else { "no" });
            }

            println!();
            for setting in &plugin.settings {
                output::print_row(&setting.key, &output::truncate(&setting.value.to_string(), 60));
                if !setting.label.is_empty() && setting.label != setting.key {
                    println!("  {:<16}   {}", "", setting.label);
                }
                if let Some(description) = &setting.description {
                    println!("  {:<16}   {}", "", description);
                }
            }
        }
        OutputFormat::Json => output::print_json(&plugin),
    }

    Ok(())
}

/// Update settings from `key=value` pairs. Values are parsed as JSON and
/// fall back to a plain string, so `name=bot` and `limit=5` both work.
pub async fn plugins_set(ctx: &Context, id: &str, pairs: &[String]) -> Result<()> {
    let settings = parse_settings(pairs)?;
    ctx.authenticated_api()?
        .update_plugin_settings(id, &settings)
        .await?;

    output::print_success(
        &format!("Updated {} setting(s) of {}", settings.len(), id),
        &ctx.format,
    );
    Ok(())
}

pub async fn plugins_action(ctx: &Context, id: &str, endpoint: &str) -> Result<()> {
    let result = ctx
        .authenticated_api()?
        .trigger_plugin_action(id, endpoint)
        .await?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&result),
        OutputFormat::Text if result.success => println!("{}", result.message),
        OutputFormat::Text => output::print_error(&result.message, &ctx.format),
    }
    Ok(())
}

fn parse_settings(pairs: &[String]) -> Result<Map<String, Value>> {
    if pairs.is_empty() {
        anyhow::bail!("Give at least one key=value pair");
    }

    let mut settings = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Empty setting name in '{}'", pair);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        settings.insert(key.to_string(), value);
    }
    Ok(settings)
}
