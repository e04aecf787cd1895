use anyhow::Context;
use clap::{Parser, Subcommand};
use sous::store::{ConversationStore, SqliteConversationStore};

#[derive(Parser)]
#[command(name = "sous")]
#[command(about = "Sous — WhatsApp chef assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory, a default config file, and the conversation database.
    Init {
        /// Config file path (default: SOUS_CONFIG_PATH or ~/.sous/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook server (GET / health, POST /message for Twilio WhatsApp).
    Serve {
        /// Config file path (default: SOUS_CONFIG_PATH or ~/.sous/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the most recent stored conversations, newest first.
    History {
        /// Config file path (default: SOUS_CONFIG_PATH or ~/.sous/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Number of conversations to show.
        #[arg(long, short, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("sous {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config).await {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::History { config, limit }) => {
            if let Err(e) = run_history(config, limit).await {
                log::error!("history failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(sous::config::default_config_path);
    let dir = sous::init::init_config_dir(&path)?;
    let (config, path) = sous::config::load_config(Some(path))?;
    let db = sous::init::init_database(&config, &path).await?;
    println!("initialized configuration at {}", dir.display());
    println!("conversation database: {}", db);
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = sous::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    sous::gateway::run_gateway(config, path).await
}

async fn run_history(config_path: Option<std::path::PathBuf>, limit: u32) -> anyhow::Result<()> {
    let (config, path) = sous::config::load_config(config_path)?;
    let url = sous::config::resolve_database_url(&config, &path);
    let store = SqliteConversationStore::open_existing(&url)
        .await
        .with_context(|| format!("opening conversation store {} (run `sous init` first)", url))?;
    let rows = store.recent(limit).await?;
    if rows.is_empty() {
        println!("no conversations stored in {}", url);
    }
    for row in rows {
        println!("#{} {} {}", row.id, row.created_at, row.sender);
        println!("> {}", row.message.trim());
        println!("< {}", row.response.trim());
        println!();
    }
    store.close().await;
    Ok(())
}
