//! Satisfaction-certificate workflow: list the bottles the connected account
//! owns, mint at most one certificate per bottle, and list minted
//! certificates.
//!
//! Ownership listing walks the company contract's token range.  A token that
//! fails to decode is skipped with a warning rather than failing the whole
//! listing; one corrupt record should not hide the rest.

use alloy_primitives::Address;

use crate::contracts::{BottleRecord, CertificateRecord};
use crate::error::WorkflowError;
use crate::status::TxStatus;

use super::WorkflowContext;

/// A bottle the connected account owns, with its certificate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBottle {
    pub record: BottleRecord,
    pub has_certificate: bool,
}

pub struct CertificateWorkflow {
    ctx: WorkflowContext,
    status: TxStatus,
}

impl CertificateWorkflow {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            status: TxStatus::default(),
        }
    }

    pub fn status(&self) -> &TxStatus {
        &self.status
    }

    /// Bottles the connected account currently owns, oldest token first.
    pub async fn list_owned_bottles(&self) -> Result<Vec<OwnedBottle>, WorkflowError> {
        let account = self.ctx.require_account()?;
        let company = self.ctx.company_contract()?;
        let satisfaction = self.ctx.satisfaction_contract()?;

        let count = company.bottle_nft_id().await?;
        let mut owned = Vec::new();
        for token_id in 1..=count {
            let record = match company.token_metadata(token_id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(token_id, error = %e, "skipping unreadable bottle token");
                    continue;
                }
            };
            if record.owner != account {
                continue;
            }
            let has_certificate = match satisfaction
                .minted_satisf_token(record.bottle_address)
                .await
            {
                Ok(token_id) => token_id > 0,
                Err(e) => {
                    tracing::warn!(token_id, error = %e, "skipping bottle with unreadable certificate state");
                    continue;
                }
            };
            owned.push(OwnedBottle {
                record,
                has_certificate,
            });
        }
        Ok(owned)
    }

    /// Mint the satisfaction certificate for an owned bottle.  Refused when
    /// one already exists; the one-per-bottle rule is also enforced on chain,
    /// this check just avoids a doomed transaction.
    pub async fn mint_certificate(&mut self, bottle: Address) -> Result<(), WorkflowError> {
        if self.status.is_pending() {
            return Err(WorkflowError::Busy);
        }
        let account = self.ctx.require_account()?;
        let company = self.ctx.company_contract()?;
        let satisfaction = self.ctx.satisfaction_contract()?;

        let existing = satisfaction.minted_satisf_token(bottle).await?;
        if existing > 0 {
            return Err(WorkflowError::Validation(format!(
                "certificate #{existing} already minted for bottle {bottle}"
            )));
        }

        self.status = TxStatus::Pending(format!("minting certificate for {bottle}"));
        let outcome = async {
            let hash = satisfaction
                .mint(account, company.address(), bottle)
                .await?;
            satisfaction.confirm(hash).await
        }
        .await;
        match outcome {
            Ok(()) => {
                tracing::info!(%bottle, "satisfaction certificate minted");
                self.status = TxStatus::Success(format!("certificate minted for {bottle}"));
                Ok(())
            }
            Err(e) => {
                self.status = TxStatus::Error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// The connected account's certificate balance and records.
    pub async fn list_certificates(
        &self,
    ) -> Result<(u64, Vec<CertificateRecord>), WorkflowError> {
        let account = self.ctx.require_account()?;
        let satisfaction = self.ctx.satisfaction_contract()?;

        let balance = satisfaction.balance_of(account).await?;
        let token_ids = satisfaction.get_certificates_by_company(account).await?;
        let mut records = Vec::with_capacity(token_ids.len());
        for token_id in token_ids {
            match satisfaction.token_metadata(token_id).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(token_id, error = %e, "skipping unreadable certificate");
                }
            }
        }
        Ok((balance, records))
    }
}
