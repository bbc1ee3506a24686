//! Workflow-boundary error taxonomy.
//!
//! Every error is recovered at the workflow boundary: converted into a
//! [`crate::TxStatus`] message or a CLI error string, never a crash.  Module
//! errors ([`crate::provider::WalletError`], [`crate::contracts::ChainError`],
//! [`crate::identity::KeyError`], [`crate::label::LabelError`]) fold into
//! this one at the workflow layer.

use crate::contracts::ChainError;
use crate::identity::KeyError;
use crate::label::LabelError;
use crate::provider::WalletError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// A required contract address has not been configured.
    #[error("{0} contract address is not configured")]
    ConfigurationMissing(&'static str),
    /// No account is connected.
    #[error("wallet is not connected")]
    NotConnected,
    /// An input precondition failed (empty field, missing key, ...).
    #[error("{0}")]
    Validation(String),
    /// This workflow already has a submission pending.
    #[error("another submission is still pending")]
    Busy,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

impl WorkflowError {
    /// True for the absent-on-chain-record case, which allows a re-scan.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkflowError::Chain(ChainError::NotFound(_)))
    }
}
