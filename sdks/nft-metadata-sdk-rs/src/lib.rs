//! Token-2022 NFT Metadata – Rust SDK (client-side helpers)
//!
//! This crate provides:
//! - Instruction builders for a Token-2022 mint that carries its own metadata
//!   (metadata pointer extension + embedded token-metadata TLV entry)
//! - Account size and funding math, and offline prediction of field updates
//! - Transaction builders for the mint-with-metadata flow (compose Vec<Instruction>)
//! - Submission, fee-payer bootstrap and on-chain readers
//!
//! Signing and submission live in [`submit`]; the builders here stay pure.

pub mod budget;
pub mod config;
pub mod error;
pub mod keypair;
pub mod reader;
pub mod submit;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_token_2022::{
    extension::{metadata_pointer, ExtensionType},
    state::Mint,
};
use spl_token_metadata_interface::{
    instruction as metadata_instruction,
    state::{Field, TokenMetadata},
};

pub use budget::{FieldFit, MetadataBudget};
pub use config::ClusterConfig;
pub use error::NftMetadataError;
pub use keypair::{initialize_keypair, KeypairOptions};
pub use reader::{AccountSource, MintDetails, TokenMetadataReader};
pub use submit::{expect_outcome, SubmitOutcome, TransactionSender};

/// Decimals for a non-fungible mint.
pub const NFT_DECIMALS: u8 = 0;

/// Base metadata fields that additional keys may not shadow.
pub const RESERVED_FIELD_KEYS: [&str; 3] = ["name", "symbol", "uri"];

/// Thin client for building Token-2022 mint and metadata instructions.
///
/// The metadata lives inside the mint account, so `metadata` and `mint` are
/// the same address in every builder that takes both.
pub struct NftMetadataClient {
    pub token_program_id: Pubkey,
}

impl Default for NftMetadataClient {
    fn default() -> Self {
        Self::new(spl_token_2022::id())
    }
}

impl NftMetadataClient {
    pub fn new(token_program_id: Pubkey) -> Self {
        Self { token_program_id }
    }

    /// Reader that expects mints owned by this client's token program.
    pub fn reader<S: AccountSource>(&self, source: S) -> TokenMetadataReader<S> {
        TokenMetadataReader::with_program_id(source, self.token_program_id)
    }

    /// Size of a mint account carrying the metadata pointer extension.
    ///
    /// This is the space allocated at creation; the metadata TLV entry is
    /// appended by the token program when metadata is initialized.
    pub fn mint_len(&self) -> anyhow::Result<usize> {
        let len =
            ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])?;
        Ok(len)
    }

    /// Size of the metadata entry inside the mint: type (2) + length (2) + packed record.
    pub fn metadata_len(&self, metadata: &TokenMetadata) -> anyhow::Result<usize> {
        budget::metadata_entry_len(metadata)
    }

    /// Build a SystemProgram create_account allocating `space` bytes owned by the token program.
    pub fn create_mint_account_ix(
        &self,
        payer: Pubkey,
        mint: Pubkey,
        lamports: u64,
        space: usize,
    ) -> Instruction {
        system_instruction::create_account(
            &payer,
            &mint,
            lamports,
            space as u64,
            &self.token_program_id,
        )
    }

    /// Build a metadata pointer initialize instruction.
    ///
    /// Must come after create_account and before initialize_mint.
    pub fn initialize_metadata_pointer_ix(
        &self,
        mint: Pubkey,
        authority: Option<Pubkey>,
        metadata_address: Option<Pubkey>,
    ) -> anyhow::Result<Instruction> {
        let ix = metadata_pointer::instruction::initialize(
            &self.token_program_id,
            &mint,
            authority,
            metadata_address,
        )?;
        Ok(ix)
    }

    /// Build a Token-2022 initialize_mint instruction.
    pub fn initialize_mint_ix(
        &self,
        mint: Pubkey,
        mint_authority: Pubkey,
        freeze_authority: Option<Pubkey>,
        decimals: u8,
    ) -> anyhow::Result<Instruction> {
        let ix = spl_token_2022::instruction::initialize_mint(
            &self.token_program_id,
            &mint,
            &mint_authority,
            freeze_authority.as_ref(),
            decimals,
        )?;
        Ok(ix)
    }

    /// Build a token-metadata Initialize instruction.
    ///
    /// Accounts (strict order):
    /// - metadata (writable)
    /// - update_authority (readonly)
    /// - mint (readonly)
    /// - mint_authority (readonly, signer)
    pub fn initialize_metadata_ix(&self, params: InitializeMetadataParams) -> Instruction {
        metadata_instruction::initialize(
            &self.token_program_id,
            &params.metadata,
            &params.update_authority,
            &params.mint,
            &params.mint_authority,
            params.name,
            params.symbol,
            params.uri,
        )
    }

    /// Build a token-metadata UpdateField instruction.
    ///
    /// Accounts (strict order):
    /// - metadata (writable)
    /// - update_authority (readonly, signer)
    pub fn update_field_ix(&self, params: UpdateFieldParams) -> Instruction {
        metadata_instruction::update_field(
            &self.token_program_id,
            &params.metadata,
            &params.update_authority,
            params.field,
            params.value,
        )
    }

    /// Build a token-metadata RemoveKey instruction.
    pub fn remove_key_ix(&self, params: RemoveKeyParams) -> Instruction {
        metadata_instruction::remove_key(
            &self.token_program_id,
            &params.metadata,
            &params.update_authority,
            params.key,
            params.idempotent,
        )
    }

    /// Build a token-metadata UpdateAuthority instruction. `None` makes the metadata immutable.
    pub fn update_authority_ix(
        &self,
        params: UpdateAuthorityParams,
    ) -> anyhow::Result<Instruction> {
        Ok(metadata_instruction::update_authority(
            &self.token_program_id,
            &params.metadata,
            &params.current_update_authority,
            params.new_authority.try_into()?,
        ))
    }

    /// The metadata record the mint will hold once the creation transaction lands.
    pub fn token_metadata(
        &self,
        params: &TxCreateNftWithMetadataParams,
    ) -> anyhow::Result<TokenMetadata> {
        self.validate_additional_metadata(&params.additional_metadata)?;
        Ok(TokenMetadata {
            update_authority: Some(params.update_authority).try_into()?,
            mint: params.mint,
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            uri: params.uri.clone(),
            additional_metadata: params.additional_metadata.clone(),
        })
    }

    /// Byte budget funded for the mint described by `params`.
    pub fn metadata_budget(
        &self,
        params: &TxCreateNftWithMetadataParams,
    ) -> anyhow::Result<MetadataBudget> {
        let metadata = self.token_metadata(params)?;
        Ok(MetadataBudget::new(
            self.mint_len()?,
            self.metadata_len(&metadata)?,
            params.extra_bytes,
        ))
    }

    // Transaction patterns (compose instructions; signing and submission left to caller)
    /// Create a Token-2022 mint whose metadata lives in the mint account itself.
    ///
    /// `lamports` must cover `metadata_budget(..).funded_len()` bytes of rent.
    ///
    /// Returns a Vec<Instruction> with: [create_account, initialize_metadata_pointer,
    /// initialize_mint, initialize_metadata, update_field * additional_metadata.len()].
    pub fn create_nft_with_metadata_tx(
        &self,
        params: TxCreateNftWithMetadataParams,
        lamports: u64,
    ) -> anyhow::Result<Vec<Instruction>> {
        self.validate_additional_metadata(&params.additional_metadata)?;

        let create_mint_ix =
            self.create_mint_account_ix(params.payer, params.mint, lamports, self.mint_len()?);

        // Points at the mint itself.
        let init_pointer_ix = self.initialize_metadata_pointer_ix(
            params.mint,
            Some(params.update_authority),
            Some(params.mint),
        )?;

        let init_mint_ix = self.initialize_mint_ix(
            params.mint,
            params.mint_authority,
            params.freeze_authority,
            params.decimals,
        )?;

        let init_md_ix = self.initialize_metadata_ix(InitializeMetadataParams {
            metadata: params.mint,
            update_authority: params.update_authority,
            mint: params.mint,
            mint_authority: params.mint_authority,
            name: params.name,
            symbol: params.symbol,
            uri: params.uri,
        });

        let mut ixs = vec![create_mint_ix, init_pointer_ix, init_mint_ix, init_md_ix];
        for (key, value) in params.additional_metadata {
            ixs.push(self.update_field_ix(UpdateFieldParams {
                metadata: params.mint,
                update_authority: params.update_authority,
                field: Field::Key(key),
                value,
            }));
        }
        Ok(ixs)
    }

    /// Convenience wrapper returning one-instruction Vec for update_field.
    pub fn update_field_tx(&self, params: UpdateFieldParams) -> Vec<Instruction> {
        vec![self.update_field_ix(params)]
    }
}

/// Map a field name to a metadata [`Field`]; anything that is not a base field is a key.
pub fn parse_field(name: &str) -> Field {
    match name {
        "name" => Field::Name,
        "symbol" => Field::Symbol,
        "uri" => Field::Uri,
        key => Field::Key(key.to_string()),
    }
}

// === Params ===
/// Parameters for the token-metadata Initialize instruction.
pub struct InitializeMetadataParams {
    /// Account holding the metadata (the mint itself when the pointer is self-referential)
    pub metadata: Pubkey,
    /// Authority allowed to update the metadata afterwards
    pub update_authority: Pubkey,
    /// Token mint the metadata describes
    pub mint: Pubkey,
    /// Current mint authority (must sign)
    pub mint_authority: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Parameters for the token-metadata UpdateField instruction.
#[derive(Clone, Debug)]
pub struct UpdateFieldParams {
    /// Account holding the metadata
    pub metadata: Pubkey,
    /// Current update authority (must sign)
    pub update_authority: Pubkey,
    /// Base field or additional key to set
    pub field: Field,
    /// New value
    pub value: String,
}

/// Parameters for the token-metadata RemoveKey instruction.
pub struct RemoveKeyParams {
    pub metadata: Pubkey,
    pub update_authority: Pubkey,
    /// Additional metadata key to remove
    pub key: String,
    /// If true, removing a missing key is not an error
    pub idempotent: bool,
}

/// Parameters for the token-metadata UpdateAuthority instruction.
pub struct UpdateAuthorityParams {
    pub metadata: Pubkey,
    /// Current update authority (must sign)
    pub current_update_authority: Pubkey,
    /// New authority, or None to make the metadata immutable
    pub new_authority: Option<Pubkey>,
}

/// Parameters for the create_nft_with_metadata transaction pattern.
#[derive(Clone, Debug)]
pub struct TxCreateNftWithMetadataParams {
    /// Payer that funds the mint account
    pub payer: Pubkey,
    /// Mint account public key (must sign)
    pub mint: Pubkey,
    /// Mint authority (must sign initialize_metadata)
    pub mint_authority: Pubkey,
    /// Optional freeze authority for the mint
    pub freeze_authority: Option<Pubkey>,
    /// Metadata update authority, also used as metadata pointer authority
    pub update_authority: Pubkey,
    /// Number of decimals for the mint ([`NFT_DECIMALS`] for an NFT)
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    /// Additional key/value fields, written in order
    pub additional_metadata: Vec<(String, String)>,
    /// Bytes funded beyond the initial metadata, available to later field growth
    pub extra_bytes: usize,
}

// === Validation helpers ===
impl NftMetadataClient {
    fn validate_additional_metadata(&self, data: &[(String, String)]) -> anyhow::Result<()> {
        for (i, (key, _)) in data.iter().enumerate() {
            if key.is_empty() {
                return Err(NftMetadataError::EmptyFieldKey.into());
            }
            if RESERVED_FIELD_KEYS.contains(&key.as_str()) {
                return Err(NftMetadataError::ReservedFieldKey(key.clone()).into());
            }
            if data[..i].iter().any(|(k, _)| k == key) {
                return Err(NftMetadataError::DuplicateFieldKey(key.clone()).into());
            }
        }
        Ok(())
    }
}
