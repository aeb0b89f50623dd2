use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tictacterm::cli::run_cli().await
}
