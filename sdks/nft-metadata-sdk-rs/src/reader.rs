//! Read a Token-2022 mint and the metadata embedded in it.

use anyhow::Context as _;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{account::Account, program_error::ProgramError, pubkey::Pubkey};
use spl_token_2022::{
    error::TokenError,
    extension::{metadata_pointer::MetadataPointer, BaseStateWithExtensions, StateWithExtensions},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;

use crate::error::NftMetadataError;

/// Source of account data. Implemented for the nonblocking [`RpcClient`].
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn account(&self, pubkey: &Pubkey) -> anyhow::Result<Option<Account>>;
}

#[async_trait]
impl AccountSource for RpcClient {
    async fn account(&self, pubkey: &Pubkey) -> anyhow::Result<Option<Account>> {
        let response = self
            .get_account_with_commitment(pubkey, self.commitment())
            .await
            .with_context(|| format!("get_account {pubkey}"))?;
        Ok(response.value)
    }
}

#[async_trait]
impl<T: AccountSource + ?Sized> AccountSource for &T {
    async fn account(&self, pubkey: &Pubkey) -> anyhow::Result<Option<Account>> {
        (**self).account(pubkey).await
    }
}

/// Decoded view of a mint account.
#[derive(Clone, Debug, PartialEq)]
pub struct MintDetails {
    pub address: Pubkey,
    pub lamports: u64,
    pub data_len: usize,
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
    /// Metadata pointer authority, if the extension is present
    pub pointer_authority: Option<Pubkey>,
    /// Metadata pointer target, if the extension is present
    pub metadata_address: Option<Pubkey>,
    /// Metadata embedded in the mint itself
    pub metadata: Option<TokenMetadata>,
}

impl MintDetails {
    /// Decode a mint owned by `token_program_id`. Absent extensions decode to
    /// `None`; malformed ones are errors.
    pub fn decode(
        address: Pubkey,
        account: &Account,
        token_program_id: &Pubkey,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            account.owner == *token_program_id,
            NftMetadataError::UnexpectedOwner {
                account: address,
                owner: account.owner,
                expected: *token_program_id,
            }
        );

        let state = StateWithExtensions::<Mint>::unpack(&account.data)
            .map_err(|e| NftMetadataError::InvalidMint(address, e))?;
        let pointer = optional_extension(address, state.get_extension::<MetadataPointer>())?;
        let metadata =
            optional_extension(address, state.get_variable_len_extension::<TokenMetadata>())?;

        Ok(Self {
            address,
            lamports: account.lamports,
            data_len: account.data.len(),
            decimals: state.base.decimals,
            supply: state.base.supply,
            mint_authority: state.base.mint_authority.into(),
            freeze_authority: state.base.freeze_authority.into(),
            pointer_authority: pointer.and_then(|p| Option::<Pubkey>::from(p.authority)),
            metadata_address: pointer.and_then(|p| Option::<Pubkey>::from(p.metadata_address)),
            metadata,
        })
    }

    /// Value of an additional metadata key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref().and_then(|md| {
            md.additional_metadata
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        let metadata = self.metadata.as_ref().map(|md| {
            serde_json::json!({
                "update_authority": Option::<Pubkey>::from(md.update_authority).map(|p| p.to_string()),
                "mint": md.mint.to_string(),
                "name": md.name,
                "symbol": md.symbol,
                "uri": md.uri,
                "additional_metadata": md.additional_metadata,
            })
        });
        serde_json::json!({
            "address": self.address.to_string(),
            "lamports": self.lamports,
            "data_len": self.data_len,
            "decimals": self.decimals,
            "supply": self.supply,
            "mint_authority": self.mint_authority.map(|p| p.to_string()),
            "freeze_authority": self.freeze_authority.map(|p| p.to_string()),
            "metadata_pointer": {
                "authority": self.pointer_authority.map(|p| p.to_string()),
                "metadata_address": self.metadata_address.map(|p| p.to_string()),
            },
            "metadata": metadata,
        })
    }
}

fn optional_extension<T>(
    address: Pubkey,
    result: Result<T, ProgramError>,
) -> Result<Option<T>, NftMetadataError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e == ProgramError::from(TokenError::ExtensionNotFound) => Ok(None),
        Err(e) => Err(NftMetadataError::InvalidMint(address, e)),
    }
}

pub struct TokenMetadataReader<S> {
    source: S,
    token_program_id: Pubkey,
}

impl<S: AccountSource> TokenMetadataReader<S> {
    /// Reader for mints owned by Token-2022.
    pub fn new(source: S) -> Self {
        Self::with_program_id(source, spl_token_2022::id())
    }

    pub fn with_program_id(source: S, token_program_id: Pubkey) -> Self {
        Self {
            source,
            token_program_id,
        }
    }

    /// Fetch and decode `mint`. Returns `None` if the account does not exist.
    pub async fn get_mint_details(&self, mint: Pubkey) -> anyhow::Result<Option<MintDetails>> {
        match self.source.account(&mint).await? {
            Some(account) => Ok(Some(MintDetails::decode(
                mint,
                &account,
                &self.token_program_id,
            )?)),
            None => Ok(None),
        }
    }

    /// Fetch the metadata embedded in `mint`, if any.
    pub async fn get_token_metadata(&self, mint: Pubkey) -> anyhow::Result<Option<TokenMetadata>> {
        Ok(self
            .get_mint_details(mint)
            .await?
            .and_then(|details| details.metadata))
    }
}
