//! Company-side workflow: register a bottle address, mint its NFT, and
//! produce the printable label.
//!
//! Register and mint are independent submissions against the same bottle
//! identity.  The label is gated on a confirmed mint so a company cannot
//! print a key for a bottle with no on-chain record.

use alloy_primitives::Address;

use crate::error::WorkflowError;
use crate::identity::BottleIdentity;
use crate::label::Label;
use crate::status::TxStatus;

use super::WorkflowContext;

/// Progress of one on-chain step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepState {
    #[default]
    Idle,
    /// Transaction accepted by the wallet, awaiting confirmation.
    Submitted,
    Confirmed,
    Failed(String),
}

pub struct CompanyWorkflow {
    ctx: WorkflowContext,
    register: StepState,
    mint: StepState,
    status: TxStatus,
    mint_success: bool,
}

impl CompanyWorkflow {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            ctx,
            register: StepState::Idle,
            mint: StepState::Idle,
            status: TxStatus::default(),
            mint_success: false,
        }
    }

    pub fn status(&self) -> &TxStatus {
        &self.status
    }

    pub fn register_state(&self) -> &StepState {
        &self.register
    }

    pub fn mint_state(&self) -> &StepState {
        &self.mint
    }

    /// True once a mint has confirmed and the label may be printed.
    pub fn mint_succeeded(&self) -> bool {
        self.mint_success
    }

    fn guard_idle(&self) -> Result<(), WorkflowError> {
        if self.status.is_pending() {
            return Err(WorkflowError::Busy);
        }
        Ok(())
    }

    /// Register the bottle address with the company contract.
    pub async fn register_bottle_address(
        &mut self,
        bottle: Address,
    ) -> Result<(), WorkflowError> {
        self.guard_idle()?;
        let account = self.ctx.require_account()?;
        let company = self.ctx.company_contract()?;

        self.status = TxStatus::Pending(format!("registering bottle {bottle}"));
        match company.register_bottle_address(account, bottle).await {
            Ok(hash) => {
                self.register = StepState::Submitted;
                match company.confirm(hash).await {
                    Ok(()) => {
                        tracing::info!(%bottle, "bottle address registered");
                        self.register = StepState::Confirmed;
                        self.status = TxStatus::Success(format!("bottle {bottle} registered"));
                        Ok(())
                    }
                    Err(e) => {
                        self.register = StepState::Failed(e.to_string());
                        self.status = TxStatus::Error(e.to_string());
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                self.register = StepState::Failed(e.to_string());
                self.status = TxStatus::Error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Mint the bottle NFT for `bottle`.  Name, description and capacity
    /// must all be non-empty.
    pub async fn mint_bottle(
        &mut self,
        bottle: Address,
        name: &str,
        description: &str,
        capacity: &str,
    ) -> Result<(), WorkflowError> {
        self.guard_idle()?;
        for (field, value) in [
            ("name", name),
            ("description", description),
            ("capacity", capacity),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::Validation(format!(
                    "bottle {field} must not be empty"
                )));
            }
        }
        let account = self.ctx.require_account()?;
        let company = self.ctx.company_contract()?;

        // any earlier success no longer stands for this attempt
        self.mint_success = false;
        self.status = TxStatus::Pending(format!("minting NFT for bottle {bottle}"));
        match company
            .mint(account, bottle, description, name, capacity)
            .await
        {
            Ok(hash) => {
                self.mint = StepState::Submitted;
                match company.confirm(hash).await {
                    Ok(()) => {
                        tracing::info!(%bottle, name, "bottle NFT minted");
                        self.mint = StepState::Confirmed;
                        self.mint_success = true;
                        self.status = TxStatus::Success(format!("NFT minted for {bottle}"));
                        Ok(())
                    }
                    Err(e) => {
                        self.mint = StepState::Failed(e.to_string());
                        self.status = TxStatus::Error(e.to_string());
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                self.mint = StepState::Failed(e.to_string());
                self.status = TxStatus::Error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Build the printable label for a freshly minted bottle.  Requires a
    /// confirmed mint and an identity that still holds its private key.
    pub fn label(
        &self,
        identity: &BottleIdentity,
        name: &str,
        description: &str,
        capacity: &str,
    ) -> Result<Label, WorkflowError> {
        if !self.mint_success {
            return Err(WorkflowError::Validation(
                "label is only available after a successful mint".into(),
            ));
        }
        let key = identity.key().ok_or_else(|| {
            WorkflowError::Validation(
                "no private key for this bottle address; labels require a generated identity"
                    .into(),
            )
        })?;
        Ok(Label::new(key, name, description, capacity, identity.address)?)
    }
}
