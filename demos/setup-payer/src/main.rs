use nft_metadata_sdk::{initialize_keypair, ClusterConfig, KeypairOptions};
use solana_sdk::signature::Signer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ClusterConfig::from_env()?;
    let rpc = config.rpc_client();
    let options = KeypairOptions::default();

    // Generates and caches PRIVATE_KEY in .env on first run, then tops up the balance
    let payer = initialize_keypair(&rpc, &options).await?;
    let balance = rpc.get_balance(&payer.pubkey()).await?;

    tracing::info!(
        payer = %payer.pubkey(),
        balance,
        env_file = %options.env_file.display(),
        "payer ready"
    );
    Ok(())
}
