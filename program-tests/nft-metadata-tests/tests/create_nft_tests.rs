use nft_metadata_sdk::NFT_DECIMALS;
use nft_metadata_tests::{cat_fields, TestContext};
use serial_test::serial;
use solana_sdk::signature::Signer;

#[tokio::test]
#[serial]
#[ignore = "requires a local validator at SOLANA_RPC_URL"]
async fn create_nft_embeds_metadata_in_mint() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let nft = ctx.create_nft(cat_fields(), 0).await?;

    let details = ctx
        .reader()
        .get_mint_details(nft.mint.pubkey())
        .await?
        .expect("mint exists");

    assert_eq!(details.decimals, NFT_DECIMALS);
    assert_eq!(details.supply, 0);
    assert_eq!(details.mint_authority, Some(ctx.payer.pubkey()));
    assert_eq!(details.freeze_authority, Some(ctx.payer.pubkey()));
    assert_eq!(details.pointer_authority, Some(ctx.payer.pubkey()));
    assert_eq!(details.metadata_address, Some(nft.mint.pubkey()));
    assert_eq!(details.metadata.as_ref(), Some(&nft.metadata));
    assert_eq!(details.field("species"), Some("Cat"));
    assert_eq!(details.field("breed"), Some("Cool"));
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires a local validator at SOLANA_RPC_URL"]
async fn create_nft_funds_exactly_the_budget() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let nft = ctx.create_nft(cat_fields(), 0).await?;

    let details = ctx
        .reader()
        .get_mint_details(nft.mint.pubkey())
        .await?
        .expect("mint exists");
    let rent = ctx
        .rpc
        .get_minimum_balance_for_rent_exemption(nft.budget.funded_len())
        .await?;

    assert_eq!(details.data_len, nft.budget.funded_len());
    assert_eq!(details.lamports, rent);
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires a local validator at SOLANA_RPC_URL"]
async fn create_nft_without_additional_fields() -> anyhow::Result<()> {
    let ctx = TestContext::new().await?;
    let nft = ctx.create_nft(Vec::new(), 0).await?;

    let metadata = ctx.metadata_of(nft.mint.pubkey()).await?;
    assert_eq!(metadata.name, "Cat NFT");
    assert_eq!(metadata.symbol, "EMB");
    assert!(metadata.uri.is_empty());
    assert!(metadata.additional_metadata.is_empty());
    Ok(())
}
