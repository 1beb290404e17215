use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tdse_server::cli::run().await
}
