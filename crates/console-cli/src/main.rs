//! botconsole - command-line admin console for the chat bot.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, SendArgs};
use console_config_and_utils::init_logging;
use tracing::debug;

/// botconsole - Manage the bot, its groups and plugins from the terminal.
#[derive(Parser)]
#[command(name = "botconsole")]
#[command(about = "Admin console for the chat bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "BOTCONSOLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Bot server origin, e.g. https://bot.example.com
    #[arg(long, global = true, env = "BOTCONSOLE_SERVER")]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with an access token
    Login {
        /// Access token (prompted without echo when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show server and authentication status
    Status,

    /// List the bot's groups
    Groups,

    /// Show recent messages of a group
    History {
        /// Group ID
        group_id: String,
    },

    /// Broadcast a message to groups
    Send(SendArgs),

    /// Stream live messages of groups until Ctrl-C
    Watch {
        /// Group IDs
        #[arg(required = true)]
        groups: Vec<String>,
    },

    /// Manage plugins
    Plugins {
        #[command(subcommand)]
        command: PluginCommands,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List plugins
    List,
    /// Show plugin settings
    Show {
        /// Plugin ID (module name)
        id: String,
    },
    /// Update plugin settings
    Set {
        /// Plugin ID (module name)
        id: String,
        /// Settings as key=value; values are JSON or plain strings
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Trigger a plugin action
    Action {
        /// Plugin ID (module name)
        id: String,
        /// Action endpoint
        endpoint: String,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(cli.server.as_deref(), cli.log_level.as_deref(), cli.format)?;

    init_logging("botconsole", &ctx.config.log_level, Some(&ctx.paths));
    debug!(server = %ctx.config.server_origin, "Configuration loaded");

    match cli.command {
        Commands::Login { token } => commands::login(&ctx, token).await,
        Commands::Logout => commands::logout(&ctx).await,
        Commands::Status => commands::status(&ctx).await,
        Commands::Groups => commands::groups_list(&ctx).await,
        Commands::History { group_id } => commands::history(&ctx, &group_id).await,
        Commands::Send(args) => commands::send(&ctx, args).await,
        Commands::Watch { groups } => commands::watch(&ctx, groups).await,
        Commands::Plugins { command } => match command {
            PluginCommands::List => commands::plugins_list(&ctx).await,
            PluginCommands::Show { id } => commands::plugins_show(&ctx, &id).await,
            PluginCommands::Set { id, values } => commands::plugins_set(&ctx, &id, &values).await,
            PluginCommands::Action { id, endpoint } => {
                commands::plugins_action(&ctx, &id, &endpoint).await
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
