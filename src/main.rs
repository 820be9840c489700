#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = qrsub_rust::run().await {
        eprintln!("qrsub-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
