//! Fee-payer bootstrap: load the payer from the environment or generate and
//! cache one in an env file, then top up its balance from the faucet.

use std::{
    fs::OpenOptions,
    io::Write as _,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};

use crate::error::NftMetadataError;

pub const DEFAULT_KEYPAIR_ENV: &str = "PRIVATE_KEY";
pub const DEFAULT_ENV_FILE: &str = ".env";

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONFIRM_MAX_POLLS: usize = 120;

#[derive(Clone, Debug)]
pub struct KeypairOptions {
    /// Variable holding the secret key as a JSON byte array
    pub env_var: String,
    /// File a freshly generated keypair is appended to
    pub env_file: PathBuf,
    /// Lamports requested when the balance is below `minimum_balance`
    pub airdrop_amount: u64,
    pub minimum_balance: u64,
}

impl Default for KeypairOptions {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_KEYPAIR_ENV.to_string(),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            airdrop_amount: LAMPORTS_PER_SOL,
            minimum_balance: LAMPORTS_PER_SOL / 2,
        }
    }
}

/// Load or create the fee payer and make sure it can pay for a few transactions.
pub async fn initialize_keypair(
    rpc: &RpcClient,
    options: &KeypairOptions,
) -> anyhow::Result<Keypair> {
    let keypair = load_or_create_keypair(options, |key| std::env::var(key).ok())?;
    let balance = airdrop_if_required(
        rpc,
        &keypair.pubkey(),
        options.airdrop_amount,
        options.minimum_balance,
    )
    .await?;
    tracing::info!(payer = %keypair.pubkey(), balance, "fee payer ready");
    Ok(keypair)
}

/// Parse the payer from `options.env_var`, or generate one and append it to `options.env_file`.
pub fn load_or_create_keypair(
    options: &KeypairOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Keypair> {
    if let Some(secret) = lookup(&options.env_var) {
        let keypair = keypair_from_json(&secret)
            .with_context(|| format!("{} does not hold a keypair", options.env_var))?;
        tracing::debug!(payer = %keypair.pubkey(), "loaded fee payer from environment");
        return Ok(keypair);
    }

    let keypair = Keypair::new();
    append_keypair_to_env_file(&options.env_file, &options.env_var, &keypair)?;
    tracing::info!(
        payer = %keypair.pubkey(),
        file = %options.env_file.display(),
        "generated fee payer"
    );
    Ok(keypair)
}

/// Parse a keypair serialized as a JSON array of 64 bytes.
pub fn keypair_from_json(s: &str) -> anyhow::Result<Keypair> {
    let bytes: Vec<u8> = serde_json::from_str(s.trim())
        .map_err(|e| NftMetadataError::InvalidKeypair(e.to_string()))?;
    let keypair =
        Keypair::from_bytes(&bytes).map_err(|e| NftMetadataError::InvalidKeypair(e.to_string()))?;
    Ok(keypair)
}

pub fn keypair_to_json(keypair: &Keypair) -> String {
    // Vec<u8> serializes as a JSON number array
    serde_json::Value::from(keypair.to_bytes().to_vec()).to_string()
}

fn append_keypair_to_env_file(path: &Path, var: &str, keypair: &Keypair) -> anyhow::Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    let prefix = format!("{var}=");
    anyhow::ensure!(
        !existing.lines().any(|line| line.starts_with(&prefix)),
        "{} already defines {var} but it was not loaded into the environment",
        path.display()
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{prefix}{}", keypair_to_json(keypair))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Request an airdrop when `pubkey` holds less than `minimum_balance`. Returns the final balance.
pub async fn airdrop_if_required(
    rpc: &RpcClient,
    pubkey: &Pubkey,
    amount: u64,
    minimum_balance: u64,
) -> anyhow::Result<u64> {
    let balance = rpc.get_balance(pubkey).await.context("get_balance")?;
    if balance >= minimum_balance {
        return Ok(balance);
    }

    tracing::info!(%pubkey, balance, amount, "requesting airdrop");
    let signature = rpc
        .request_airdrop(pubkey, amount)
        .await
        .context("request_airdrop")?;
    wait_for_confirmation(rpc, &signature).await?;

    let balance = rpc.get_balance(pubkey).await.context("get_balance")?;
    Ok(balance)
}

async fn wait_for_confirmation(rpc: &RpcClient, signature: &Signature) -> anyhow::Result<()> {
    for _ in 0..CONFIRM_MAX_POLLS {
        if rpc
            .confirm_transaction(signature)
            .await
            .context("confirm_transaction")?
        {
            return Ok(());
        }
        tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
    }
    anyhow::bail!("airdrop {signature} was not confirmed in time")
}
