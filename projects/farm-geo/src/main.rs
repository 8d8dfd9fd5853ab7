use anyhow::Result;
use farm_geo::cli::Args;
use farm_geo::web::server::run_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();

    run_server(args.host, args.port).await?;

    Ok(())
}
