use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use duet_server::{CodeGenerator, RandomCodeGenerator, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet")]
#[command(bin_name = "duet")]
#[command(about = "Two-party rooms with chat, file transfer and video calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server.
    Serve(ServeArgs),
    /// Print a fresh room code and its join link.
    Code {
        #[arg(long, env = "DUET_BASE_URL", default_value = "http://localhost:3000/")]
        base: String,
    },
}

#[derive(Args, Default)]
struct ServeArgs {
    /// JSON config file; flags override its values.
    #[arg(short, long, env = "DUET_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "DUET_BIND")]
    bind: Option<SocketAddr>,

    /// Seconds an empty room waits for a rejoin.
    #[arg(long, env = "DUET_GRACE_SECS")]
    grace_secs: Option<u64>,

    #[arg(long, env = "DUET_ROOM_TTL_SECS")]
    ttl_secs: Option<u64>,

    #[arg(long, env = "DUET_MAX_FILE_BYTES")]
    max_file_bytes: Option<u64>,

    #[arg(long, env = "DUET_TURN_URL", requires_all = ["turn_username", "turn_credential"])]
    turn_url: Option<String>,

    #[arg(long, env = "DUET_TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "DUET_TURN_CREDENTIAL", hide_env_values = true)]
    turn_credential: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(secs) = self.grace_secs {
            config.empty_room_grace_secs = secs;
        }
        if let Some(secs) = self.ttl_secs {
            config.room_ttl_secs = secs;
        }
        if let Some(bytes) = self.max_file_bytes {
            config.max_file_bytes = bytes;
        }
        match (self.turn_url, self.turn_username, self.turn_credential) {
            (Some(url), Some(username), Some(credential)) => {
                config.add_turn_server(url, username, credential)
            }
            (None, _, _) => {}
            _ => anyhow::bail!("--turn-url needs --turn-username and --turn-credential"),
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let config = args.into_config()?;
            info!(bind = %config.bind, max_file_bytes = config.max_file_bytes, "Configuration resolved");
            println!("{}", "🚀 Starting Duet signaling server...".green().bold());
            println!("   🔌 WebSocket: ws://{}/ws", config.bind);
            println!(
                "   ⏳ Empty rooms close after {}s, every room after {}s",
                config.empty_room_grace_secs, config.room_ttl_secs
            );
            println!("   🧊 ICE servers: {}", config.ice_servers.len());

            duet_server::serve(config).await?;
        }
        Commands::Code { base } => {
            let code = RandomCodeGenerator.next_code();
            let link = code
                .join_url(&base)
                .with_context(|| format!("Invalid base URL {base}"))?;

            println!("{}", code.as_str().cyan().bold());
            println!("   🔗 {}", link);
        }
    }

    Ok(())
}
