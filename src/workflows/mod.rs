//! The three user-facing workflows.
//!
//! Workflows receive an explicit [`WorkflowContext`] instead of reaching for
//! ambient session state: the provider, the loaded contract configuration,
//! and the connected account travel together, which keeps the workflows
//! testable against fake sessions.

mod certificate;
mod company;
mod transfer;

pub use certificate::{CertificateWorkflow, OwnedBottle};
pub use company::{CompanyWorkflow, StepState};
pub use transfer::{TransferStage, TransferWorkflow};

use std::sync::Arc;

use alloy_primitives::Address;

use crate::config::ContractConfig;
use crate::contracts::{CompanyContract, SatisfactionContract};
use crate::error::WorkflowError;
use crate::provider::WalletProvider;
use crate::session::WalletSession;

/// Everything a workflow needs, passed explicitly.
#[derive(Clone)]
pub struct WorkflowContext {
    pub provider: Arc<dyn WalletProvider>,
    pub config: ContractConfig,
    pub account: Option<Address>,
}

impl WorkflowContext {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        config: ContractConfig,
        account: Option<Address>,
    ) -> Self {
        Self {
            provider,
            config,
            account,
        }
    }

    pub fn from_session(session: &WalletSession, config: ContractConfig) -> Self {
        Self {
            provider: session.provider().clone(),
            config,
            account: session.account(),
        }
    }

    fn require_account(&self) -> Result<Address, WorkflowError> {
        self.account.ok_or(WorkflowError::NotConnected)
    }

    fn company_contract(&self) -> Result<CompanyContract, WorkflowError> {
        let address = self
            .config
            .company
            .ok_or(WorkflowError::ConfigurationMissing("company"))?;
        Ok(CompanyContract::new(address, self.provider.clone()))
    }

    fn satisfaction_contract(&self) -> Result<SatisfactionContract, WorkflowError> {
        let address = self
            .config
            .customer_satisfaction
            .ok_or(WorkflowError::ConfigurationMissing("satisfaction"))?;
        Ok(SatisfactionContract::new(address, self.provider.clone()))
    }
}
