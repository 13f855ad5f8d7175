//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use console_api::ApiError;
use serde_json::json;

/// Exchange an access token for a session and remember it.
pub async fn login(ctx: &Context, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => rpassword::prompt_password("Access token: ")?,
    };

    if token.trim().is_empty() {
        output::print_error("Access token is required", &ctx.format);
        return Ok(());
    }

    let mut api = ctx.api()?;
    let auth = api.login(&token).await?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&auth),
        OutputFormat::Text if auth.success => {
            match &auth.bot {
                Some(bot) => println!("Logged in. Managing {} ({})", bot.nickname, bot.qq),
                None => println!("Logged in"),
            }
            if let Some(role) = &auth.role {
                output::print_row("Role", &format!("{:?}", role).to_lowercase());
            }
        }
        OutputFormat::Text => {
            let reason = auth.message.as_deref().unwrap_or("Authentication failed");
            output::print_error(&format!("Login failed: {}", reason), &ctx.format);
        }
    }

    Ok(())
}

/// Forget the stored token.
pub async fn logout(ctx: &Context) -> Result<()> {
    let mut api = ctx.api()?;
    api.logout()?;
    output::print_success("Logged out successfully", &ctx.format);
    Ok(())
}

/// Show the server, whether a token is stored and, if so, the bot it manages.
pub async fn status(ctx: &Context) -> Result<()> {
    let api = ctx.api()?;
    let server = ctx.config.server_origin.as_str();

    if !api.is_authenticated() {
        match ctx.format {
            OutputFormat::Text => {
                output::print_row("Server", server);
                output::print_row("Auth", "not logged in");
            }
            OutputFormat::Json => {
                output::print_json(&json!({ "server": server, "logged_in": false }));
            }
        }
        return Ok(());
    }

    let (logged_in, bot) = match api.bot_info().await {
        Ok(bot) => (true, Some(bot)),
        Err(ApiError::Unauthorized) => (false, None),
        Err(e) => return Err(e.into()),
    };

    match ctx.format {
        OutputFormat::Text => {
            output::print_row("Server", server);
            output::print_row(
                "Auth",
                if logged_in { "logged in" } else { "token rejected, log in again" },
            );
            if let Some(bot) = &bot {
                output::print_row("Bot", &format!("{} ({})", bot.nickname, bot.qq));
            }
        }
        OutputFormat::Json => {
            output::print_json(&json!({ "server": server, "logged_in": logged_in, "bot": bot }));
        }
    }

    Ok(())
}
