use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hookgram")]
#[command(about = "Hookgram CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config with a fresh hook secret.
    Init {
        /// Config file path (default: HOOKGRAM_CONFIG_PATH or ~/.hookgram/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the gateway (hook intake, preview pages, Telegram bot).
    Gateway {
        /// Config file path (default: HOOKGRAM_CONFIG_PATH or ~/.hookgram/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Convert a Slack-style payload and print the parse mode and message text. Reads stdin without FILE.
    Convert {
        /// Payload JSON file
        file: Option<PathBuf>,

        /// Config file path, for preview link settings
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print the hook URL for a chat.
    HookUrl {
        /// Telegram chat id
        #[arg(long, value_name = "ID")]
        chat: String,

        /// Config file path (default: HOOKGRAM_CONFIG_PATH or ~/.hookgram/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("hookgram {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Convert { file, config }) => {
            if let Err(e) = run_convert(file, config) {
                log::error!("convert failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::HookUrl { chat, config }) => {
            if let Err(e) = run_hook_url(&chat, config) {
                log::error!("hook-url failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(hookgram::config::default_config_path);
    let dir = hookgram::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = hookgram::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    hookgram::gateway::run_gateway(config).await
}

fn run_convert(file: Option<PathBuf>, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let body = match file {
        Some(ref path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading payload from stdin")?;
            buf
        }
    };
    let (config, _) = hookgram::config::load_config(config_path)?;
    let previews = hookgram::gateway::preview_links(&config)?;
    let payload = hookgram::webhook::Payload::from_json(&body).context("decoding payload")?;
    let assembled = hookgram::webhook::assemble(&payload, previews.as_ref())
        .ok_or(hookgram::webhook::WebhookError::MissingContent)?;
    println!("{}", assembled.dialect.parse_mode());
    println!("{}", assembled.text);
    Ok(())
}

fn run_hook_url(chat_id: &str, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = hookgram::config::load_config(config_path)?;
    let secret = hookgram::config::resolve_hook_secret(&config).with_context(|| {
        format!(
            "no hook secret in {} (run `hookgram init` or set HOOKGRAM_HOOK_SECRET)",
            path.display()
        )
    })?;
    let signer = hookgram::hooks::HookSigner::new(&secret)?;
    let public_url = hookgram::config::resolve_public_url(&config);
    println!("{}", signer.hook_url(&public_url, chat_id));
    Ok(())
}
