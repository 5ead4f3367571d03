use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gourmet")]
#[command(about = "Gourmet bot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook gateway (POST /callback, GET /). Credentials come from the environment (or a .env file in the working directory) and override the config file.
    Serve {
        /// Config file path (default: GOURMET_CONFIG_PATH or ~/.gourmet/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Check that config loads and every credential resolves. Values are never printed.
    CheckConfig {
        /// Config file path (default: GOURMET_CONFIG_PATH or ~/.gourmet/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Loaded once per process; handlers only see the resolved Config.
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => log::debug!("no .env file found"),
        Err(e) => log::warn!("ignoring unreadable .env file: {}", e),
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("gourmet {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig { config }) => {
            if let Err(e) = run_check_config(config) {
                log::error!("config check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(config_path: Option<std::path::PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

fn run_check_config(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    println!("config: {}", path.display());
    let status = |found: bool| if found { "ok" } else { "missing" };
    println!(
        "channel secret:       {}",
        status(lib::config::resolve_channel_secret(&config).is_some())
    );
    println!(
        "channel access token: {}",
        status(lib::config::resolve_channel_access_token(&config).is_some())
    );
    println!(
        "search api key:       {}",
        status(lib::config::resolve_search_api_key(&config).is_some())
    );
    lib::config::resolve_credentials(&config)?;
    println!(
        "listen:               {}:{}",
        config.gateway.bind, config.gateway.port
    );
    Ok(())
}
