//! Typed clients for the two external contracts.
//!
//! The ABIs are given, not designed here: `Company` registers bottle
//! addresses and records per-bottle metadata, `CustomerSatisfaction` mints at
//! most one certificate per bottle (uniqueness enforced on-chain).  Calls are
//! encoded/decoded with `alloy-sol-types`; everything travels through the
//! [`WalletProvider`] capability.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};

use crate::identity::BottleKey;
use crate::provider::{TxHash, WalletError, WalletProvider};
use crate::tx::{LegacyTransaction, SigningError, TRANSFER_GAS_LIMIT};

sol! {
    interface Company {
        function registerBottleAddress(address bottle) external;
        function mint(address bottle, string memory description, string memory name, string memory capacity) external;
        function tokenMetadata(uint256 token_id) external view returns (string memory name, string memory description, string memory capacity, address bottle_owner, address address_bottle, address address_company);
        function bottleNFTId() external view returns (uint256 count);
        function getTokenData(address bottle) external view returns (string memory name, string memory description, string memory capacity, address bottle_owner, address address_company);
        function setAddressOwner(address new_owner) external;
    }

    interface CustomerSatisfaction {
        function balanceOf(address owner) external view returns (uint256 balance);
        function getCertificatesByCompany(address owner) external view returns (uint256[] memory token_ids);
        function tokenMetadata(uint256 token_id) external view returns (address bottle_owner, address company_address, address bottle_address);
        function mintedSatisfToken(address bottle) external view returns (uint256 token_id);
        function mint(address company, address bottle) external;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("could not decode contract response: {0}")]
    Decode(String),
    #[error("no on-chain record for {0}")]
    NotFound(String),
    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// A bottle's on-chain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleRecord {
    /// Known when the record came from a token-id lookup.
    pub token_id: Option<u64>,
    pub name: String,
    pub description: String,
    pub capacity: String,
    pub owner: Address,
    pub bottle_address: Address,
    pub company_address: Address,
}

/// A satisfaction certificate's on-chain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    pub token_id: u64,
    pub bottle_owner: Address,
    pub company_address: Address,
    pub bottle_address: Address,
}

/// Decode call-return data, mapping empty data (absent/reverted record) to
/// [`ChainError::NotFound`].
fn decode_returns<C: SolCall>(data: &[u8], what: impl Into<String>) -> Result<C::Return, ChainError> {
    if data.is_empty() {
        return Err(ChainError::NotFound(what.into()));
    }
    C::abi_decode_returns(data, true).map_err(|e| ChainError::Decode(e.to_string()))
}

fn saturating_u64(value: U256) -> u64 {
    value.saturating_to::<u64>()
}

// =============================================================================
// Company contract
// =============================================================================

#[derive(Clone)]
pub struct CompanyContract {
    address: Address,
    provider: Arc<dyn WalletProvider>,
}

impl CompanyContract {
    pub fn new(address: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self { address, provider }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Register a bottle address, signed by the connected wallet.  Duplicate
    /// registration is the contract's concern; its error text passes through.
    pub async fn register_bottle_address(
        &self,
        from: Address,
        bottle: Address,
    ) -> Result<TxHash, ChainError> {
        let data = Company::registerBottleAddressCall { bottle }.abi_encode();
        let hash = self.provider.send_transaction(from, self.address, data).await?;
        tracing::debug!(%bottle, %hash, "registerBottleAddress submitted");
        Ok(hash)
    }

    /// Mint the bottle NFT.  Argument order matches the deployed ABI:
    /// bottle, description, name, capacity.
    pub async fn mint(
        &self,
        from: Address,
        bottle: Address,
        description: &str,
        name: &str,
        capacity: &str,
    ) -> Result<TxHash, ChainError> {
        let data = Company::mintCall {
            bottle,
            description: description.to_owned(),
            name: name.to_owned(),
            capacity: capacity.to_owned(),
        }
        .abi_encode();
        let hash = self.provider.send_transaction(from, self.address, data).await?;
        tracing::debug!(%bottle, %hash, "mint submitted");
        Ok(hash)
    }

    /// Total number of minted bottle tokens.
    pub async fn bottle_nft_id(&self) -> Result<u64, ChainError> {
        let data = Company::bottleNFTIdCall {}.abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret = decode_returns::<Company::bottleNFTIdCall>(&raw, "bottle token count")?;
        Ok(saturating_u64(ret.count))
    }

    pub async fn token_metadata(&self, token_id: u64) -> Result<BottleRecord, ChainError> {
        let data = Company::tokenMetadataCall {
            token_id: U256::from(token_id),
        }
        .abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret = decode_returns::<Company::tokenMetadataCall>(
            &raw,
            format!("bottle token #{token_id}"),
        )?;
        Ok(BottleRecord {
            token_id: Some(token_id),
            name: ret.name,
            description: ret.description,
            capacity: ret.capacity,
            owner: ret.bottle_owner,
            bottle_address: ret.address_bottle,
            company_address: ret.address_company,
        })
    }

    pub async fn get_token_data(&self, bottle: Address) -> Result<BottleRecord, ChainError> {
        let data = Company::getTokenDataCall { bottle }.abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret =
            decode_returns::<Company::getTokenDataCall>(&raw, format!("bottle {bottle}"))?;
        Ok(BottleRecord {
            token_id: None,
            name: ret.name,
            description: ret.description,
            capacity: ret.capacity,
            owner: ret.bottle_owner,
            bottle_address: bottle,
            company_address: ret.address_company,
        })
    }

    /// Transfer ownership to `new_owner`, signed by the bottle's own key.
    /// Possession of the key is the authorization; the connected wallet never
    /// signs this transaction.
    pub async fn set_address_owner(
        &self,
        key: &BottleKey,
        new_owner: Address,
    ) -> Result<TxHash, ChainError> {
        let data = Company::setAddressOwnerCall { new_owner }.abi_encode();
        let bottle = key.address();
        let nonce = self.provider.transaction_count(bottle).await?;
        let gas_price = self.provider.gas_price().await?;
        let chain_id = self.provider.chain_id().await?;
        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS_LIMIT,
            to: self.address,
            value: U256::ZERO,
            data,
        };
        let raw = tx.sign(key.signing_key(), chain_id)?;
        let hash = self.provider.send_raw_transaction(raw).await?;
        tracing::debug!(%bottle, %new_owner, %hash, "setAddressOwner submitted");
        Ok(hash)
    }

    pub async fn confirm(&self, tx: TxHash) -> Result<(), ChainError> {
        Ok(self.provider.await_confirmation(tx).await?)
    }
}

// =============================================================================
// Satisfaction contract
// =============================================================================

#[derive(Clone)]
pub struct SatisfactionContract {
    address: Address,
    provider: Arc<dyn WalletProvider>,
}

impl SatisfactionContract {
    pub fn new(address: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self { address, provider }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn balance_of(&self, owner: Address) -> Result<u64, ChainError> {
        let data = CustomerSatisfaction::balanceOfCall { owner }.abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret = decode_returns::<CustomerSatisfaction::balanceOfCall>(
            &raw,
            format!("certificate balance of {owner}"),
        )?;
        Ok(saturating_u64(ret.balance))
    }

    pub async fn get_certificates_by_company(
        &self,
        owner: Address,
    ) -> Result<Vec<u64>, ChainError> {
        let data = CustomerSatisfaction::getCertificatesByCompanyCall { owner }.abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret = decode_returns::<CustomerSatisfaction::getCertificatesByCompanyCall>(
            &raw,
            format!("certificates of {owner}"),
        )?;
        Ok(ret.token_ids.into_iter().map(saturating_u64).collect())
    }

    pub async fn token_metadata(&self, token_id: u64) -> Result<CertificateRecord, ChainError> {
        let data = CustomerSatisfaction::tokenMetadataCall {
            token_id: U256::from(token_id),
        }
        .abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret = decode_returns::<CustomerSatisfaction::tokenMetadataCall>(
            &raw,
            format!("certificate #{token_id}"),
        )?;
        Ok(CertificateRecord {
            token_id,
            bottle_owner: ret.bottle_owner,
            company_address: ret.company_address,
            bottle_address: ret.bottle_address,
        })
    }

    /// Token id of the certificate minted for a bottle; 0 means none exists.
    pub async fn minted_satisf_token(&self, bottle: Address) -> Result<u64, ChainError> {
        let data = CustomerSatisfaction::mintedSatisfTokenCall { bottle }.abi_encode();
        let raw = self.provider.call(self.address, data).await?;
        let ret = decode_returns::<CustomerSatisfaction::mintedSatisfTokenCall>(
            &raw,
            format!("certificate lookup for {bottle}"),
        )?;
        Ok(saturating_u64(ret.token_id))
    }

    /// Mint a satisfaction certificate, signed by the connected wallet.
    pub async fn mint(
        &self,
        from: Address,
        company: Address,
        bottle: Address,
    ) -> Result<TxHash, ChainError> {
        let data = CustomerSatisfaction::mintCall { company, bottle }.abi_encode();
        let hash = self.provider.send_transaction(from, self.address, data).await?;
        tracing::debug!(%bottle, %hash, "certificate mint submitted");
        Ok(hash)
    }

    pub async fn confirm(&self, tx: TxHash) -> Result<(), ChainError> {
        Ok(self.provider.await_confirmation(tx).await?)
    }
}
