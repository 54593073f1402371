use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    scorebridge_cli::cli::app::run().await
}
