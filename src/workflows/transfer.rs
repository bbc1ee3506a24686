//! Customer-side workflow: scan a label, verify the bottle on chain, and
//! claim ownership.
//!
//! Possession of the scanned private key is the sole transfer credential:
//! the claim transaction is signed with the bottle's own key, never the
//! connected wallet.  The connected wallet only names the new owner.

use alloy_primitives::Address;

use crate::contracts::BottleRecord;
use crate::error::WorkflowError;
use crate::identity::BottleKey;
use crate::status::TxStatus;

use super::WorkflowContext;

/// Where the scan-verify-claim sequence currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransferStage {
    /// Waiting for a label scan.
    #[default]
    Scanning,
    /// Key parsed, on-chain lookup in progress.
    Verifying,
    /// The bottle has a genuine on-chain record.
    Verified(BottleRecord),
    /// No record exists for the scanned key's address.
    VerificationFailed(String),
    /// Claim transaction submitted, awaiting confirmation.
    TransferPending,
    TransferSucceeded(BottleRecord),
    TransferFailed(String),
}

pub struct TransferWorkflow {
    ctx: WorkflowContext,
    stage: TransferStage,
    status: TxStatus,
    key: Option<BottleKey>,
}

impl TransferWorkflow {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            stage: TransferStage::Scanning,
            status: TxStatus::default(),
            key: None,
        }
    }

    pub fn stage(&self) -> &TransferStage {
        &self.stage
    }

    pub fn status(&self) -> &TxStatus {
        &self.status
    }

    /// The scanned bottle's address, once a scan has succeeded.
    pub fn bottle_address(&self) -> Option<Address> {
        self.key.as_ref().map(BottleKey::address)
    }

    /// Accept decoded scanner text.  A malformed payload keeps the workflow
    /// in the scanning stage so the user can simply scan again.
    pub fn scan(&mut self, decoded_text: &str) -> Result<Address, WorkflowError> {
        match BottleKey::from_hex(decoded_text) {
            Ok(key) => {
                let address = key.address();
                tracing::debug!(bottle = %address, "label scanned");
                self.key = Some(key);
                self.stage = TransferStage::Verifying;
                Ok(address)
            }
            Err(e) => {
                self.stage = TransferStage::Scanning;
                Err(e.into())
            }
        }
    }

    /// Look up the scanned bottle's record.  An absent record is a failed
    /// verification, not an error: the bottle is simply not genuine.
    pub async fn verify(&mut self) -> Result<&TransferStage, WorkflowError> {
        let bottle = match self.bottle_address() {
            Some(address) => address,
            None => {
                return Err(WorkflowError::Validation(
                    "nothing scanned yet".into(),
                ))
            }
        };
        let company = self.ctx.company_contract()?;
        self.stage = TransferStage::Verifying;
        match company.get_token_data(bottle).await {
            Ok(record) => {
                tracing::info!(%bottle, owner = %record.owner, "bottle verified");
                self.stage = TransferStage::Verified(record);
                Ok(&self.stage)
            }
            Err(crate::contracts::ChainError::NotFound(_)) => {
                tracing::warn!(%bottle, "no on-chain record; bottle is not genuine");
                self.stage =
                    TransferStage::VerificationFailed(format!("no record for {bottle}"));
                Ok(&self.stage)
            }
            Err(e) => {
                self.stage = TransferStage::Scanning;
                Err(e.into())
            }
        }
    }

    /// True when the verified bottle belongs to someone other than the
    /// connected account, i.e. a transfer makes sense.
    pub fn transfer_offered(&self) -> bool {
        let TransferStage::Verified(record) = &self.stage else {
            return false;
        };
        let Some(account) = self.ctx.account else {
            return false;
        };
        record.owner != account
    }

    /// Transfer the bottle to the connected account, signing with the
    /// scanned key.
    pub async fn claim_ownership(&mut self) -> Result<&TransferStage, WorkflowError> {
        if self.status.is_pending() {
            return Err(WorkflowError::Busy);
        }
        if !matches!(self.stage, TransferStage::Verified(_)) {
            return Err(WorkflowError::Validation(
                "bottle must be verified before claiming ownership".into(),
            ));
        }
        let account = self.ctx.require_account()?;
        let company = self.ctx.company_contract()?;
        let key = self
            .key
            .clone()
            .ok_or_else(|| WorkflowError::Validation("nothing scanned yet".into()))?;
        let bottle = key.address();

        self.stage = TransferStage::TransferPending;
        self.status = TxStatus::Pending(format!("claiming ownership of {bottle}"));
        let outcome = async {
            let hash = company.set_address_owner(&key, account).await?;
            company.confirm(hash).await?;
            // re-read the record so the caller sees the new owner
            company.get_token_data(bottle).await
        }
        .await;
        match outcome {
            Ok(record) => {
                tracing::info!(%bottle, owner = %record.owner, "ownership transferred");
                self.status = TxStatus::Success(format!("you now own {bottle}"));
                self.stage = TransferStage::TransferSucceeded(record);
                Ok(&self.stage)
            }
            Err(e) => {
                self.status = TxStatus::Error(e.to_string());
                self.stage = TransferStage::TransferFailed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Reset to the scanning stage, discarding the scanned key.
    pub fn rescan(&mut self) {
        self.key = None;
        self.stage = TransferStage::Scanning;
        self.status = TxStatus::Idle;
    }
}
