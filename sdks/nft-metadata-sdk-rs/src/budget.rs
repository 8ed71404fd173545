//! Byte budget of a mint that embeds its own metadata.
//!
//! The mint account is allocated with only the metadata pointer extension and
//! funded for `mint_len + metadata_len + extra_bytes` bytes of rent. The
//! token program grows the account as metadata is written and rejects any
//! write whose new size is no longer rent exempt. Rent is linear in data
//! length, so the funding can be reasoned about in bytes.

use spl_token_metadata_interface::state::{Field, TokenMetadata};

/// Extension type (u16) + length (u16) preceding every Token-2022 extension.
pub const EXTENSION_HEADER_LEN: usize = 4;

/// Length of the metadata entry inside a Token-2022 mint.
pub fn metadata_entry_len(metadata: &TokenMetadata) -> anyhow::Result<usize> {
    let packed = borsh::to_vec(metadata)?;
    Ok(EXTENSION_HEADER_LEN + packed.len())
}

/// Whether an update fits in the funded account size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldFit {
    Fits,
    ExceedsBudget {
        /// Account size after the update
        required: usize,
        /// Account size the funding covers
        available: usize,
    },
}

impl FieldFit {
    pub fn fits(&self) -> bool {
        matches!(self, FieldFit::Fits)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MetadataBudget {
    /// Space allocated by create_account
    pub mint_len: usize,
    /// Metadata entry length at creation
    pub metadata_len: usize,
    /// Additional bytes funded for later growth
    pub extra_bytes: usize,
}

impl MetadataBudget {
    pub fn new(mint_len: usize, metadata_len: usize, extra_bytes: usize) -> Self {
        Self {
            mint_len,
            metadata_len,
            extra_bytes,
        }
    }

    /// Account size covered by the rent-exempt funding.
    pub fn funded_len(&self) -> usize {
        self.mint_len + self.metadata_len + self.extra_bytes
    }

    /// Predict whether writing `value` into `field` keeps the mint rent exempt.
    ///
    /// Updating an undeclared key appends a new entry, so it only fits if the
    /// funded slack can hold the whole key/value pair.
    pub fn check_update(
        &self,
        current: &TokenMetadata,
        field: Field,
        value: String,
    ) -> anyhow::Result<FieldFit> {
        let mut next = current.clone();
        next.update(field, value);

        let required = self.mint_len + metadata_entry_len(&next)?;
        let available = self.funded_len();
        tracing::debug!(required, available, "metadata update size check");

        if required <= available {
            Ok(FieldFit::Fits)
        } else {
            Ok(FieldFit::ExceedsBudget {
                required,
                available,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn cat_metadata() -> TokenMetadata {
        TokenMetadata {
            update_authority: Some(Pubkey::new_unique()).try_into().unwrap(),
            mint: Pubkey::new_unique(),
            name: "Cat NFT".into(),
            symbol: "EMB".into(),
            uri: String::new(),
            additional_metadata: vec![
                ("species".into(), "Cat".into()),
                ("breed".into(), "Cool".into()),
            ],
        }
    }

    fn exact_budget(md: &TokenMetadata, extra_bytes: usize) -> MetadataBudget {
        MetadataBudget::new(234, metadata_entry_len(md).unwrap(), extra_bytes)
    }

    #[test]
    fn same_length_update_fits() {
        let md = cat_metadata();
        let budget = exact_budget(&md, 0);
        let fit = budget
            .check_update(&md, Field::Key("species".into()), "Dog".into())
            .unwrap();
        assert_eq!(fit, FieldFit::Fits);
    }

    #[test]
    fn shorter_update_fits() {
        let md = cat_metadata();
        let budget = exact_budget(&md, 0);
        assert!(budget
            .check_update(&md, Field::Key("breed".into()), "Ok".into())
            .unwrap()
            .fits());
    }

    #[test]
    fn longer_update_exceeds() {
        let md = cat_metadata();
        let budget = exact_budget(&md, 0);
        let value = "Longer string that will put it over the amount of bytes it has";
        let fit = budget
            .check_update(&md, Field::Key("species".into()), value.into())
            .unwrap();
        assert_eq!(
            fit,
            FieldFit::ExceedsBudget {
                required: budget.funded_len() + value.len() - "Cat".len(),
                available: budget.funded_len(),
            }
        );
    }

    #[test]
    fn undeclared_field_exceeds_without_slack() {
        let md = cat_metadata();
        let budget = exact_budget(&md, 0);
        let fit = budget
            .check_update(&md, Field::Key("New Field".into()), "x".into())
            .unwrap();
        assert!(!fit.fits());
    }

    #[test]
    fn extra_bytes_absorb_growth() {
        let md = cat_metadata();
        // 4 + "New Field" + 4 + "x"
        let budget = exact_budget(&md, 4 + 9 + 4 + 1);
        assert!(budget
            .check_update(&md, Field::Key("New Field".into()), "x".into())
            .unwrap()
            .fits());
        assert!(!budget
            .check_update(&md, Field::Key("New Field".into()), "xy".into())
            .unwrap()
            .fits());
    }

    #[test]
    fn base_field_growth_counts_too() {
        let md = cat_metadata();
        let budget = exact_budget(&md, 2);
        assert!(budget
            .check_update(&md, Field::Name, "Cat NFT!!".into())
            .unwrap()
            .fits());
        assert!(!budget
            .check_update(&md, Field::Uri, "ipfs".into())
            .unwrap()
            .fits());
    }
}
