//! Playground CLI - Chat with Mistral-compatible models from the terminal.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use playground_client::{API_KEY_ENV, ENDPOINT_ENV};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod config;
mod error;
mod render;
mod store;

use commands::{App, OptionOverrides, SettingsChanges};
use config::Config;

/// Playground CLI - Chat, compare and share conversations
#[derive(Parser)]
#[command(name = "playground")]
#[command(about = "Terminal chat playground", long_about = None)]
struct Cli {
    /// API endpoint (default https://api.mistral.ai)
    #[arg(long, global = true, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// API key
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Where chats and settings are stored
    #[arg(long, global = true, env = "PLAYGROUND_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OptionArgs {
    /// Model id
    #[arg(short, long)]
    model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    top_p: Option<f32>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Random seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Ask for a JSON object and pretty-print it
    #[arg(long)]
    json: bool,

    /// Prepend the endpoint's safety prompt
    #[arg(long)]
    safe_prompt: bool,
}

impl From<OptionArgs> for OptionOverrides {
    fn from(args: OptionArgs) -> Self {
        Self {
            model: args.model,
            system: args.system,
            temperature: args.temperature,
            top_p: args.top_p,
            max_tokens: args.max_tokens,
            seed: args.seed,
            json: args.json,
            safe_prompt: args.safe_prompt,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a model; interactive when no prompt is given
    Chat {
        /// Prompt for a one-shot answer
        prompt: Option<String>,

        /// Continue a saved chat
        #[arg(short, long)]
        chat: Option<String>,

        #[command(flatten)]
        options: OptionArgs,

        /// Do not save the chat
        #[arg(long)]
        no_save: bool,
    },

    /// Generate a new version of a chat's last answer
    Regenerate {
        /// Chat ID
        id: String,
    },

    /// Ask two models the same question
    Compare {
        prompt: String,

        /// Model for the second side
        #[arg(long)]
        against: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Do not copy options to the second side
        #[arg(long)]
        no_sync: bool,

        /// Do not save the chats
        #[arg(long)]
        no_save: bool,
    },

    /// List available models
    Models,

    /// List saved chats by day
    History,

    /// Print a saved chat
    Show {
        /// Chat ID
        id: String,
    },

    /// Delete a saved chat
    Delete {
        /// Chat ID
        id: String,
    },

    /// Print a share token for a saved chat
    Share {
        /// Chat ID
        id: String,
    },

    /// Print a chat from a share token
    #[command(name = "open-share")]
    OpenShare {
        token: String,

        /// Save it as a new chat
        #[arg(long)]
        save: bool,
    },

    /// Show or change default settings
    Settings {
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        seed: Option<i64>,

        /// Default endpoint; pass an empty string to clear
        #[arg(long = "default-endpoint")]
        default_endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so piped answers stay clean
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = Config::new(cli.data_dir, cli.api_key, cli.endpoint)?;
    let mut app = App::open(config)?;

    match cli.command {
        Commands::Chat {
            prompt,
            chat,
            options,
            no_save,
        } => {
            app.chat(prompt, chat, &options.into(), !no_save).await?;
        }
        Commands::Regenerate { id } => {
            app.regenerate(&id).await?;
        }
        Commands::Compare {
            prompt,
            against,
            options,
            no_sync,
            no_save,
        } => {
            app.compare(prompt, against, &options.into(), !no_sync, !no_save)
                .await?;
        }
        Commands::Models => {
            app.models().await?;
        }
        Commands::History => {
            app.history()?;
        }
        Commands::Show { id } => {
            app.show(&id)?;
        }
        Commands::Delete { id } => {
            app.delete(&id)?;
        }
        Commands::Share { id } => {
            app.share(&id)?;
        }
        Commands::OpenShare { token, save } => {
            app.open_share(&token, save)?;
        }
        Commands::Settings {
            model,
            temperature,
            seed,
            default_endpoint,
        } => {
            app.update_settings(SettingsChanges {
                model,
                temperature,
                seed,
                endpoint: default_endpoint,
            })?;
        }
    }

    Ok(())
}
