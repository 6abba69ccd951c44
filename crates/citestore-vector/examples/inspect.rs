use citestore_core::config::Config;
use citestore_core::logging;
use citestore_vector::VectorStoreConnector;

// Usage: cargo run -p citestore-vector --example inspect -- [sample]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("info");
    let sample = std::env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(5usize);
    let settings = Config::load()?.settings()?;
    let connector = VectorStoreConnector::from_settings(&settings).await?;
    match connector.inspect(sample).await? {
        Some(summary) => print!("{summary}"),
        None => println!("collection '{}' does not exist yet", connector.collection_name()),
    }
    connector.close().await?;
    Ok(())
}
