//! Error types

use solana_sdk::{program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

/// Errors raised by the SDK before anything reaches the network.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NftMetadataError {
    /// Additional metadata key is empty
    #[error("additional metadata key must not be empty")]
    EmptyFieldKey,
    /// Additional metadata key collides with a base field
    #[error("additional metadata key `{0}` shadows a base metadata field")]
    ReservedFieldKey(String),
    /// Additional metadata key declared twice
    #[error("additional metadata key `{0}` declared more than once")]
    DuplicateFieldKey(String),
    /// Account is not owned by the expected token program
    #[error("account {account} is owned by {owner}, expected {expected}")]
    UnexpectedOwner {
        /// Account that was read
        account: Pubkey,
        /// Actual owner
        owner: Pubkey,
        /// Expected token program
        expected: Pubkey,
    },
    /// Account data could not be decoded as a Token-2022 mint
    #[error("account {0} is not a Token-2022 mint: {1}")]
    InvalidMint(Pubkey, ProgramError),
    /// Keypair material could not be parsed
    #[error("invalid keypair material: {0}")]
    InvalidKeypair(String),
}
