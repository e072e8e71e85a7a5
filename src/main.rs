use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    docsmith_cli::run().await
}
