use clap::Parser;
use wordchain_server::{args::Args, run, setup_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();
    let args = Args::parse();
    let config = args.game_config();
    run(args.host, config).await
}
