//! Sign, send and confirm transactions against a cluster.

use anyhow::Context as _;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::{Transaction, TransactionError},
};

use crate::budget::FieldFit;

/// Result of a submission whose on-chain rejection is an acceptable answer.
#[derive(Debug)]
pub enum SubmitOutcome {
    Confirmed(Signature),
    Rejected {
        error: TransactionError,
        /// Program logs from preflight simulation, when the node returned them
        logs: Vec<String>,
    },
}

impl SubmitOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SubmitOutcome::Rejected { .. })
    }
}

pub struct TransactionSender<'a> {
    rpc: &'a RpcClient,
}

impl<'a> TransactionSender<'a> {
    pub fn new(rpc: &'a RpcClient) -> Self {
        Self { rpc }
    }

    /// Sign `instructions` with `signers` (fee payer first) against the latest blockhash.
    pub async fn sign(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> anyhow::Result<Transaction> {
        let recent_blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .context("get_latest_blockhash")?;
        let mut tx = Transaction::new_with_payer(instructions, Some(payer));
        tx.try_sign(signers, recent_blockhash)
            .context("sign transaction")?;
        Ok(tx)
    }

    /// Send and wait for confirmation at the client's commitment. Any failure is an error.
    pub async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> anyhow::Result<Signature> {
        let tx = self.sign(instructions, payer, signers).await?;
        tracing::debug!(instructions = instructions.len(), "submitting transaction");
        match self.rpc.send_and_confirm_transaction(&tx).await {
            Ok(signature) => Ok(signature),
            Err(err) => {
                let logs = simulation_logs(&err);
                if !logs.is_empty() {
                    tracing::error!("transaction failed, logs:\n\t{}", logs.join("\n\t"));
                }
                Err(err).context("send_and_confirm_transaction")
            }
        }
    }

    /// Like [`Self::send_and_confirm`], but an on-chain rejection is returned as
    /// [`SubmitOutcome::Rejected`]. Transport and RPC failures are still errors.
    pub async fn send_allowing_rejection(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> anyhow::Result<SubmitOutcome> {
        let tx = self.sign(instructions, payer, signers).await?;
        match self.rpc.send_and_confirm_transaction(&tx).await {
            Ok(signature) => Ok(SubmitOutcome::Confirmed(signature)),
            Err(err) => classify(err),
        }
    }
}

/// Check an update's outcome against its predicted fit: an update that fits
/// must confirm and one that exceeds the funded budget must be rejected.
pub fn expect_outcome(fit: FieldFit, outcome: SubmitOutcome) -> anyhow::Result<()> {
    match (fit, outcome) {
        (FieldFit::Fits, SubmitOutcome::Confirmed(signature)) => {
            tracing::info!(%signature, "update confirmed");
            Ok(())
        }
        (FieldFit::Fits, SubmitOutcome::Rejected { error, logs }) => {
            if !logs.is_empty() {
                tracing::error!("update rejected, logs:\n\t{}", logs.join("\n\t"));
            }
            anyhow::bail!("update fits the funded budget but was rejected: {error}")
        }
        (
            FieldFit::ExceedsBudget {
                required,
                available,
            },
            SubmitOutcome::Rejected { error, logs },
        ) => {
            tracing::info!(required, available, %error, "This should fail");
            tracing::debug!("logs:\n\t{}", logs.join("\n\t"));
            Ok(())
        }
        (
            FieldFit::ExceedsBudget {
                required,
                available,
            },
            SubmitOutcome::Confirmed(signature),
        ) => anyhow::bail!(
            "update needs {required} bytes of {available} funded but was confirmed: {signature}"
        ),
    }
}

fn classify(err: ClientError) -> anyhow::Result<SubmitOutcome> {
    match err.get_transaction_error() {
        Some(error) => Ok(SubmitOutcome::Rejected {
            logs: simulation_logs(&err),
            error,
        }),
        None => Err(err).context("send_and_confirm_transaction"),
    }
}

fn simulation_logs(err: &ClientError) -> Vec<String> {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) => result.logs.clone().unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::InstructionError;

    #[test]
    fn on_chain_rejection_is_an_outcome() {
        let err = ClientError::from(TransactionError::InstructionError(
            0,
            InstructionError::Custom(1),
        ));
        let outcome = classify(err).unwrap();
        match outcome {
            SubmitOutcome::Rejected { error, logs } => {
                assert_eq!(
                    error,
                    TransactionError::InstructionError(0, InstructionError::Custom(1))
                );
                assert!(logs.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn rent_rejection_is_an_outcome() {
        let err = ClientError::from(TransactionError::InsufficientFundsForRent {
            account_index: 1,
        });
        assert!(classify(err).unwrap().is_rejected());
    }

    #[test]
    fn transport_failure_propagates() {
        let err = ClientError::from(ClientErrorKind::Custom("connection refused".into()));
        let err = classify(err).unwrap_err();
        assert!(format!("{err:#}").contains("connection refused"));
    }

    fn rejection() -> SubmitOutcome {
        SubmitOutcome::Rejected {
            error: TransactionError::InsufficientFundsForRent { account_index: 1 },
            logs: vec!["Program log: insufficient funds".into()],
        }
    }

    const OVER: FieldFit = FieldFit::ExceedsBudget {
        required: 420,
        available: 400,
    };

    #[test]
    fn fitting_update_must_confirm() {
        expect_outcome(FieldFit::Fits, SubmitOutcome::Confirmed(Signature::default())).unwrap();
        let err = expect_outcome(FieldFit::Fits, rejection()).unwrap_err();
        assert!(err.to_string().contains("was rejected"));
    }

    #[test]
    fn oversized_update_must_be_rejected() {
        expect_outcome(OVER, rejection()).unwrap();
        let err =
            expect_outcome(OVER, SubmitOutcome::Confirmed(Signature::default())).unwrap_err();
        assert!(err.to_string().contains("420 bytes of 400 funded"));
    }
}
