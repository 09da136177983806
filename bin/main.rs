use anyhow::Result;
use pool_frontend::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
