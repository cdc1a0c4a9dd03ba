use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchlist_server::config::Config;
use watchlist_server::ServerError;

#[derive(Parser, Debug)]
#[command(name = "watchlist-server")]
#[command(about = "Movie watchlist and favorites server", long_about = None)]
struct Args {
    /// YAML config file; development defaults are used when omitted.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", ServerError::from(e));
                std::process::exit(1);
            }
        },
        None => Config::development(),
    };
    config.debug |= args.debug;

    let default_filter = if config.debug {
        "watchlist_server=debug,tower_http=debug"
    } else {
        "watchlist_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(config.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    match args.config {
        Some(ref path) => tracing::info!("Using config file: {}", path),
        None => tracing::info!("No config file given, using development defaults"),
    }

    if let Err(e) = watchlist_server::run(config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
