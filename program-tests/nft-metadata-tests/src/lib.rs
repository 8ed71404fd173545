//! Shared fixtures for tests that run against a local validator
//! (`solana-test-validator`, or whatever `SOLANA_RPC_URL` points at).

use nft_metadata_sdk::{
    keypair::airdrop_if_required, ClusterConfig, MetadataBudget, NftMetadataClient,
    SubmitOutcome, TokenMetadataReader, TransactionSender, TxCreateNftWithMetadataParams,
    UpdateFieldParams, NFT_DECIMALS,
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use spl_token_metadata_interface::state::{Field, TokenMetadata};

pub struct TestContext {
    pub rpc: RpcClient,
    pub payer: Keypair,
    pub client: NftMetadataClient,
}

/// A mint created by [`TestContext::create_nft`].
pub struct TestNft {
    pub mint: Keypair,
    pub metadata: TokenMetadata,
    pub budget: MetadataBudget,
}

impl TestContext {
    /// Connect using the environment's cluster settings and fund a fresh payer.
    pub async fn new() -> anyhow::Result<Self> {
        tracing_subscriber::fmt::try_init().ok();

        let config = ClusterConfig::from_env()?;
        let rpc = config.rpc_client();
        let payer = Keypair::new();
        airdrop_if_required(&rpc, &payer.pubkey(), 2 * LAMPORTS_PER_SOL, LAMPORTS_PER_SOL)
            .await?;

        Ok(Self {
            rpc,
            payer,
            client: NftMetadataClient::default(),
        })
    }

    pub fn sender(&self) -> TransactionSender<'_> {
        TransactionSender::new(&self.rpc)
    }

    pub fn reader(&self) -> TokenMetadataReader<&RpcClient> {
        self.client.reader(&self.rpc)
    }

    pub fn nft_params(
        &self,
        mint: Pubkey,
        additional_metadata: Vec<(String, String)>,
        extra_bytes: usize,
    ) -> TxCreateNftWithMetadataParams {
        TxCreateNftWithMetadataParams {
            payer: self.payer.pubkey(),
            mint,
            mint_authority: self.payer.pubkey(),
            freeze_authority: Some(self.payer.pubkey()),
            update_authority: self.payer.pubkey(),
            decimals: NFT_DECIMALS,
            name: "Cat NFT".into(),
            symbol: "EMB".into(),
            uri: String::new(),
            additional_metadata,
            extra_bytes,
        }
    }

    /// Create a mint with embedded metadata, funded for `extra_bytes` of growth.
    pub async fn create_nft(
        &self,
        additional_metadata: Vec<(String, String)>,
        extra_bytes: usize,
    ) -> anyhow::Result<TestNft> {
        let mint = Keypair::new();
        let params = self.nft_params(mint.pubkey(), additional_metadata, extra_bytes);
        let metadata = self.client.token_metadata(&params)?;
        let budget = self.client.metadata_budget(&params)?;
        let lamports = self
            .rpc
            .get_minimum_balance_for_rent_exemption(budget.funded_len())
            .await?;
        let ixs = self.client.create_nft_with_metadata_tx(params, lamports)?;
        self.sender()
            .send_and_confirm(&ixs, &self.payer.pubkey(), &[&self.payer, &mint])
            .await?;
        Ok(TestNft {
            mint,
            metadata,
            budget,
        })
    }

    /// Submit a single update_field signed by `authority`, returning the outcome.
    pub async fn update_field(
        &self,
        mint: Pubkey,
        authority: &Keypair,
        field: Field,
        value: &str,
    ) -> anyhow::Result<SubmitOutcome> {
        let ixs = self.client.update_field_tx(UpdateFieldParams {
            metadata: mint,
            update_authority: authority.pubkey(),
            field,
            value: value.to_string(),
        });
        self.sender()
            .send_allowing_rejection(&ixs, &self.payer.pubkey(), &[&self.payer, authority])
            .await
    }

    pub async fn metadata_of(&self, mint: Pubkey) -> anyhow::Result<TokenMetadata> {
        self.reader()
            .get_token_metadata(mint)
            .await?
            .ok_or_else(|| anyhow::anyhow!("metadata not found for {mint}"))
    }
}

pub fn cat_fields() -> Vec<(String, String)> {
    vec![
        ("species".into(), "Cat".into()),
        ("breed".into(), "Cool".into()),
    ]
}
