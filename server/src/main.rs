use anyhow::Result;
use clap::Parser;
use freqsearch_server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "freqsearch-server")]
#[command(about = "Serve term-frequency search over the corpus listed in config.json", long_about = None)]
struct Args {
    /// Corpus directory: config.json and the document paths it lists are resolved here
    #[arg(long, default_value = ".")]
    root: String,
    /// Address the search API listens on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port the search API listens on
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let app = build_app(&args.root)?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, root = %args.root, "search API ready");
    axum::serve(listener, app).await?;
    Ok(())
}
