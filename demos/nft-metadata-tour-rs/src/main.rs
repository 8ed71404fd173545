use anyhow::Context;
use nft_metadata_sdk::{
    expect_outcome, initialize_keypair, ClusterConfig, KeypairOptions, NftMetadataClient,
    TransactionSender, TxCreateNftWithMetadataParams, UpdateFieldParams, NFT_DECIMALS,
};
use solana_sdk::signature::{Keypair, Signer};
use spl_token_metadata_interface::state::Field;
use tracing_subscriber::EnvFilter;

const EXTRA_BYTES_ENV: &str = "EXTRA_METADATA_BYTES";

#[tokio::main]
async fn main() {
    // Load env from .env (PRIVATE_KEY is cached there on first run)
    let _ = dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => tracing::info!("Finished successfully"),
        Err(e) => {
            tracing::error!("{e:?}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ClusterConfig::from_env()?;
    let rpc = config.rpc_client();
    tracing::info!(rpc = %config.rpc_url, commitment = ?config.commitment.commitment, "connecting");

    let payer = initialize_keypair(&rpc, &KeypairOptions::default()).await?;

    let extra_bytes = match std::env::var(EXTRA_BYTES_ENV) {
        Ok(v) => v
            .parse::<usize>()
            .with_context(|| format!("{EXTRA_BYTES_ENV}={v} is not a byte count"))?,
        Err(_) => 0,
    };

    // Generate a fresh mint keypair for this run
    let mint = Keypair::new();

    let params = TxCreateNftWithMetadataParams {
        payer: payer.pubkey(),
        mint: mint.pubkey(),
        mint_authority: payer.pubkey(),
        freeze_authority: Some(payer.pubkey()),
        update_authority: payer.pubkey(),
        decimals: NFT_DECIMALS,
        name: "Cat NFT".into(),
        symbol: "EMB".into(),
        uri: String::new(),
        additional_metadata: vec![
            ("species".into(), "Cat".into()),
            ("breed".into(), "Cool".into()),
        ],
        extra_bytes,
    };

    let client = NftMetadataClient::default();
    let mut metadata = client.token_metadata(&params)?;
    let budget = client.metadata_budget(&params)?;
    let lamports = rpc
        .get_minimum_balance_for_rent_exemption(budget.funded_len())
        .await
        .context("get_minimum_balance_for_rent_exemption")?;

    tracing::info!(
        mint_len = budget.mint_len,
        metadata_len = budget.metadata_len,
        extra_bytes,
        lamports,
        "Building instructions: [create_account, initialize_metadata_pointer, initialize_mint(decimals=0), initialize_metadata, update_field*]"
    );
    let tx_instructions = client.create_nft_with_metadata_tx(params.clone(), lamports)?;

    let sender = TransactionSender::new(&rpc);
    let signature = sender
        .send_and_confirm(&tx_instructions, &payer.pubkey(), &[&payer, &mint])
        .await
        .context("create mint with metadata")?;
    tracing::info!(%signature, mint = %mint.pubkey(), "mint created");

    // Verify the mint and its embedded metadata
    let reader = client.reader(&rpc);
    let details = reader
        .get_mint_details(mint.pubkey())
        .await?
        .context("mint account not found")?;

    anyhow::ensure!(
        details.decimals == NFT_DECIMALS,
        "decimals mismatch; expected={} actual={}",
        NFT_DECIMALS,
        details.decimals
    );
    anyhow::ensure!(
        details.metadata_address == Some(mint.pubkey()),
        "metadata pointer mismatch; expected={} actual={:?}",
        mint.pubkey(),
        details.metadata_address
    );
    anyhow::ensure!(
        details.metadata.as_ref() == Some(&metadata),
        "metadata mismatch; expected={:?} actual={:?}",
        metadata,
        details.metadata
    );
    tracing::info!(metadata = ?details.metadata, "metadata verified");

    // -------- field update checks ---------
    tracing::info!("Running tests");

    let cases = [
        // same length as "Cat"
        ("species", "Dog"),
        (
            "species",
            "Longer string that will put it over the amount of bytes it has",
        ),
        (
            "New Field",
            "This will fail as the field does not exist in the metadata schema",
        ),
    ];

    for (key, value) in cases {
        let field = Field::Key(key.to_string());
        let fit = budget.check_update(&metadata, field.clone(), value.to_string())?;
        let ixs = client.update_field_tx(UpdateFieldParams {
            metadata: mint.pubkey(),
            update_authority: payer.pubkey(),
            field: field.clone(),
            value: value.to_string(),
        });

        tracing::info!(key, value, fit = ?fit, "updating field");
        let outcome = sender
            .send_allowing_rejection(&ixs, &payer.pubkey(), &[&payer])
            .await
            .with_context(|| format!("update {key}"))?;
        expect_outcome(fit, outcome).with_context(|| format!("update {key}"))?;
        if fit.fits() {
            metadata.update(field, value.to_string());
        }
    }

    let final_metadata = reader
        .get_token_metadata(mint.pubkey())
        .await?
        .context("metadata not found")?;
    anyhow::ensure!(
        final_metadata == metadata,
        "metadata mismatch after updates; expected={:?} actual={:?}",
        metadata,
        final_metadata
    );
    tracing::info!(metadata = ?final_metadata, "final metadata");
    Ok(())
}
