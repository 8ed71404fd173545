use std::str::FromStr;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use nft_metadata_sdk::{
    keypair::keypair_from_json, parse_field, ClusterConfig, NftMetadataClient, RemoveKeyParams,
    SubmitOutcome, TransactionSender, TxCreateNftWithMetadataParams, UpdateAuthorityParams,
    UpdateFieldParams, NFT_DECIMALS,
};
use serde::Serialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

fn parse_pubkey(s: &str) -> anyhow::Result<Pubkey> {
    Pubkey::from_str(s).with_context(|| format!("invalid pubkey {s}"))
}

fn parse_kvs(kvs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(kvs.len());
    for kv in kvs {
        let Some((k, v)) = kv.split_once('=') else {
            anyhow::bail!("invalid --field {kv}, expected key=value");
        };
        anyhow::ensure!(!k.is_empty(), "empty key in --field {kv}");
        out.push((k.to_string(), v.to_string()));
    }
    Ok(out)
}

#[derive(Clone, Debug)]
enum SignerSourceKind {
    Prompt,
    Stdin,
    File,
    Env,
}

#[derive(Clone, Debug, Args)]
struct SignerArg {
    /// Signer source: prompt|stdin|file:/path|env:VAR (secret as a JSON byte array)
    #[arg(long = "payer", alias = "signer", default_value = "env:PRIVATE_KEY")]
    signer: String,
}

fn keypair_from_source(spec: &str) -> anyhow::Result<Keypair> {
    use std::io::Read as _;
    let (kind, rest) = if let Some(rest) = spec.strip_prefix("file:") {
        (SignerSourceKind::File, rest)
    } else if let Some(rest) = spec.strip_prefix("env:") {
        (SignerSourceKind::Env, rest)
    } else if spec == "stdin" {
        (SignerSourceKind::Stdin, "")
    } else {
        (SignerSourceKind::Prompt, "")
    };

    let secret = Zeroizing::new(match kind {
        SignerSourceKind::Prompt => rpassword::prompt_password("enter signer keypair JSON: ")?,
        SignerSourceKind::Stdin => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        SignerSourceKind::File => {
            std::fs::read_to_string(rest).with_context(|| format!("read {}", rest))?
        }
        SignerSourceKind::Env => {
            std::env::var(rest).with_context(|| format!("env {} not set", rest))?
        }
    });
    keypair_from_json(&secret)
}

/// Resolve an optional secondary signer, defaulting to the payer.
fn signer_or_payer(spec: Option<&String>, payer: &Keypair) -> anyhow::Result<Keypair> {
    match spec {
        Some(spec) => keypair_from_source(spec),
        None => Ok(payer.insecure_clone()),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "nft-metadata",
    version,
    about = "Token-2022 NFT metadata CLI",
    long_about = "Command-line interface for creating Token-2022 mints with embedded metadata and editing their fields.\nJSON is always printed to stdout; logs/status to stderr."
)]
struct Cli {
    /// RPC endpoint URL [default: local validator]
    #[arg(env = nft_metadata_sdk::config::RPC_URL_ENV, global = true, long)]
    rpc: Option<String>,

    /// Commitment level used for reads and confirmations [default: finalized]
    #[arg(env = nft_metadata_sdk::config::COMMITMENT_ENV, global = true, long)]
    commitment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show mint + metadata pointer + embedded metadata
    #[command(alias = "inspect", alias = "info")]
    Show {
        #[arg(long)]
        mint: String,
    },
    #[command(subcommand, alias = "m", about = "Token-2022 mint operations")]
    Mint(MintCmd),
    #[command(subcommand, alias = "md", about = "Embedded metadata operations")]
    Metadata(MetadataCmd),
}

#[derive(Subcommand, Debug)]
enum MintCmd {
    /// Create a mint with metadata pointer and embedded metadata in one transaction
    #[command(alias = "new")]
    Create {
        /// Token name
        #[arg(long)]
        name: String,

        /// Token symbol
        #[arg(long)]
        symbol: String,

        /// Metadata URI
        #[arg(long, default_value = "")]
        uri: String,

        /// Repeatable key=value additional field
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Bytes funded beyond the initial metadata for later growth
        #[arg(long, default_value_t = 0)]
        extra_bytes: usize,

        /// Number of decimals for the mint
        #[arg(long, default_value_t = NFT_DECIMALS)]
        decimals: u8,

        /// Payer signer source
        #[command(flatten)]
        payer: SignerArg,
    },
}

#[derive(Subcommand, Debug)]
enum MetadataCmd {
    /// Set a base field (name|symbol|uri) or an additional key
    #[command(alias = "set")]
    UpdateField {
        /// Mint address
        #[arg(long)]
        mint: String,
        /// Field name
        #[arg(long)]
        field: String,
        /// New value
        #[arg(long)]
        value: String,
        /// Payer signer source
        #[command(flatten)]
        payer: SignerArg,
        /// Update authority signer (defaults to payer)
        #[arg(long)]
        update_authority: Option<String>,
    },

    /// Remove an additional key
    #[command(alias = "rm")]
    RemoveKey {
        /// Mint address
        #[arg(long)]
        mint: String,
        /// Key to remove
        #[arg(long)]
        key: String,
        /// Succeed even if the key is absent
        #[arg(long, default_value_t = false)]
        idempotent: bool,
        /// Payer signer source
        #[command(flatten)]
        payer: SignerArg,
        /// Update authority signer (defaults to payer)
        #[arg(long)]
        update_authority: Option<String>,
    },

    /// Transfer or clear the metadata update authority
    #[command(alias = "auth")]
    UpdateAuthority {
        /// Mint address
        #[arg(long)]
        mint: String,
        /// New authority
        #[arg(long, required_unless_present = "clear")]
        new_authority: Option<String>,
        /// Clear the authority, making the metadata immutable
        #[arg(long, conflicts_with = "new_authority")]
        clear: bool,
        /// Payer signer source
        #[command(flatten)]
        payer: SignerArg,
        /// Current update authority signer (defaults to payer)
        #[arg(long)]
        current_update_authority: Option<String>,
    },
}

#[derive(Serialize)]
struct TxReport {
    status: &'static str,
    signature: Option<String>,
    error: Option<String>,
    logs: Vec<String>,
}

impl From<SubmitOutcome> for TxReport {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Confirmed(signature) => Self {
                status: "confirmed",
                signature: Some(signature.to_string()),
                error: None,
                logs: Vec::new(),
            },
            SubmitOutcome::Rejected { error, logs } => Self {
                status: "rejected",
                signature: None,
                error: Some(error.to_string()),
                logs,
            },
        }
    }
}

async fn submit_and_report(
    rpc: &RpcClient,
    label: &str,
    ixs: &[Instruction],
    payer: &Keypair,
    authority: &Keypair,
) -> anyhow::Result<()> {
    let outcome = TransactionSender::new(rpc)
        .send_allowing_rejection(ixs, &payer.pubkey(), &[payer, authority])
        .await?;
    if let SubmitOutcome::Rejected { error, .. } = &outcome {
        tracing::warn!(%error, "{label} rejected on-chain");
    }
    let report = TxReport::from(outcome);
    eprintln!("{label}: status={}", report.status);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = ClusterConfig::with_overrides(args.rpc, args.commitment.as_deref())?;
    let rpc = config.rpc_client();
    let client = NftMetadataClient::default();

    match args.command {
        Commands::Show { mint } => {
            let mint_pk = parse_pubkey(&mint)?;
            let details = client
                .reader(&rpc)
                .get_mint_details(mint_pk)
                .await?;
            let json = details.map(|d| d.to_json());
            println!("{}", serde_json::to_string_pretty(&json)?);
        }

        Commands::Mint(MintCmd::Create {
            name,
            symbol,
            uri,
            fields,
            extra_bytes,
            decimals,
            payer,
        }) => {
            let payer_kp = keypair_from_source(&payer.signer)?;
            let payer_pk = payer_kp.pubkey();

            // Generate fresh mint keypair
            let mint_kp = Keypair::new();

            let params = TxCreateNftWithMetadataParams {
                payer: payer_pk,
                mint: mint_kp.pubkey(),
                mint_authority: payer_pk,
                freeze_authority: Some(payer_pk),
                update_authority: payer_pk,
                decimals,
                name,
                symbol,
                uri,
                additional_metadata: parse_kvs(&fields)?,
                extra_bytes,
            };
            let budget = client.metadata_budget(&params)?;
            let lamports = rpc
                .get_minimum_balance_for_rent_exemption(budget.funded_len())
                .await?;
            let ixs = client.create_nft_with_metadata_tx(params, lamports)?;

            let signature = TransactionSender::new(&rpc)
                .send_and_confirm(&ixs, &payer_pk, &[&payer_kp, &mint_kp])
                .await?;

            eprintln!("mint.create: signature={}", signature);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "signature": signature.to_string(),
                    "mint": mint_kp.pubkey().to_string(),
                    "mint_len": budget.mint_len,
                    "metadata_len": budget.metadata_len,
                    "funded_len": budget.funded_len(),
                    "lamports": lamports,
                }))?
            );
        }

        Commands::Metadata(MetadataCmd::UpdateField {
            mint,
            field,
            value,
            payer,
            update_authority,
        }) => {
            let payer_kp = keypair_from_source(&payer.signer)?;
            let auth_kp = signer_or_payer(update_authority.as_ref(), &payer_kp)?;
            let mint_pk = parse_pubkey(&mint)?;

            let ixs = client.update_field_tx(UpdateFieldParams {
                metadata: mint_pk,
                update_authority: auth_kp.pubkey(),
                field: parse_field(&field),
                value,
            });
            submit_and_report(&rpc, "metadata.update-field", &ixs, &payer_kp, &auth_kp).await?;
        }

        Commands::Metadata(MetadataCmd::RemoveKey {
            mint,
            key,
            idempotent,
            payer,
            update_authority,
        }) => {
            let payer_kp = keypair_from_source(&payer.signer)?;
            let auth_kp = signer_or_payer(update_authority.as_ref(), &payer_kp)?;
            let mint_pk = parse_pubkey(&mint)?;

            let ix = client.remove_key_ix(RemoveKeyParams {
                metadata: mint_pk,
                update_authority: auth_kp.pubkey(),
                key,
                idempotent,
            });
            submit_and_report(&rpc, "metadata.remove-key", &[ix], &payer_kp, &auth_kp).await?;
        }

        Commands::Metadata(MetadataCmd::UpdateAuthority {
            mint,
            new_authority,
            clear,
            payer,
            current_update_authority,
        }) => {
            let payer_kp = keypair_from_source(&payer.signer)?;
            let current_kp = signer_or_payer(current_update_authority.as_ref(), &payer_kp)?;
            let mint_pk = parse_pubkey(&mint)?;
            let new_pk = match (new_authority.as_deref(), clear) {
                (_, true) => None,
                (Some(s), false) => Some(parse_pubkey(s)?),
                (None, false) => anyhow::bail!("--new-authority or --clear required"),
            };

            let ix = client.update_authority_ix(UpdateAuthorityParams {
                metadata: mint_pk,
                current_update_authority: current_kp.pubkey(),
                new_authority: new_pk,
            })?;
            submit_and_report(
                &rpc,
                "metadata.update-authority",
                &[ix],
                &payer_kp,
                &current_kp,
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::commitment_config::CommitmentConfig;

    #[test]
    fn parses_key_value_fields() {
        let kvs = parse_kvs(&["species=Cat".into(), "motto=a=b".into(), "empty=".into()]).unwrap();
        assert_eq!(
            kvs,
            vec![
                ("species".to_string(), "Cat".to_string()),
                ("motto".to_string(), "a=b".to_string()),
                ("empty".to_string(), String::new()),
            ]
        );
        assert!(parse_kvs(&["novalue".into()]).is_err());
        assert!(parse_kvs(&["=x".into()]).is_err());
    }

    #[test]
    fn cli_parses_create_command() {
        let cli = Cli::try_parse_from([
            "nft-metadata",
            "mint",
            "create",
            "--name",
            "Cat NFT",
            "--symbol",
            "EMB",
            "--field",
            "species=Cat",
            "--field",
            "breed=Cool",
            "--payer",
            "env:PRIVATE_KEY",
        ])
        .unwrap();
        match cli.command {
            Commands::Mint(MintCmd::Create {
                fields,
                extra_bytes,
                decimals,
                uri,
                ..
            }) => {
                assert_eq!(fields, vec!["species=Cat", "breed=Cool"]);
                assert_eq!(extra_bytes, 0);
                assert_eq!(decimals, 0);
                assert!(uri.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn update_authority_requires_target_or_clear() {
        let base = ["nft-metadata", "metadata", "update-authority", "--mint", "x"];
        assert!(Cli::try_parse_from(base).is_err());
        assert!(Cli::try_parse_from(base.iter().copied().chain(["--clear"])).is_ok());
        assert!(Cli::try_parse_from(
            base.iter()
                .copied()
                .chain(["--clear", "--new-authority", "y"])
        )
        .is_err());
    }

    #[test]
    fn keypair_from_env_source() {
        let keypair = Keypair::new();
        let var = "NFT_METADATA_CLI_TEST_KEYPAIR";
        std::env::set_var(
            var,
            nft_metadata_sdk::keypair::keypair_to_json(&keypair),
        );
        let loaded = keypair_from_source(&format!("env:{var}")).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
        std::env::remove_var(var);
    }

    #[test]
    fn cluster_flags_are_optional() {
        let cli = Cli::try_parse_from(["nft-metadata", "show", "--mint", "x"]).unwrap();
        let config = ClusterConfig::with_overrides(cli.rpc, cli.commitment.as_deref()).unwrap();
        let defaults = ClusterConfig::from_env().unwrap();
        assert_eq!(config.rpc_url, defaults.rpc_url);
        assert_eq!(config.commitment, defaults.commitment);

        let cli = Cli::try_parse_from([
            "nft-metadata",
            "show",
            "--mint",
            "x",
            "--rpc",
            "http://localhost:9000",
            "--commitment",
            "confirmed",
        ])
        .unwrap();
        let config = ClusterConfig::with_overrides(cli.rpc, cli.commitment.as_deref()).unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9000");
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
    }
}
