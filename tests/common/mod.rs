//! In-memory chain double for end-to-end workflow tests.
//!
//! Implements [`WalletProvider`] over a mutable ledger of registered bottle
//! addresses, bottle NFTs and satisfaction certificates.  Read calls are
//! dispatched on ABI selectors and answered with ABI-encoded returns; raw
//! transactions are RLP-decoded and their sender recovered from the
//! signature, so the bottle-key transfer path is exercised for real.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolCall;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use tokio::sync::watch;

use bottleseal::contracts::{Company, CustomerSatisfaction};
use bottleseal::provider::{BoxFuture, TxHash, WalletError, WalletProvider};
use bottleseal::ContractConfig;

pub const COMPANY_CONTRACT: Address = Address::new([0xC0; 20]);
pub const SATISFACTION_CONTRACT: Address = Address::new([0xC5; 20]);
pub const CHAIN_ID: u64 = 1337;

#[derive(Debug, Clone)]
struct Bottle {
    name: String,
    description: String,
    capacity: String,
    owner: Address,
    address: Address,
}

#[derive(Debug, Clone)]
struct Certificate {
    owner: Address,
    company: Address,
    bottle: Address,
}

#[derive(Default)]
struct Ledger {
    registered: HashSet<Address>,
    bottles: Vec<Bottle>,
    certificates: Vec<Certificate>,
    /// Human-readable log of every contract-touching request.
    calls: Vec<String>,
    tx_counter: u64,
}

pub struct MockChain {
    accounts: Vec<Address>,
    ledger: Mutex<Ledger>,
    accounts_rx: watch::Receiver<Vec<Address>>,
    _accounts_tx: watch::Sender<Vec<Address>>,
}

fn revert(msg: &str) -> WalletError {
    WalletError::Provider {
        code: 3,
        message: format!("execution reverted: {msg}"),
    }
}

impl MockChain {
    pub fn new(accounts: Vec<Address>) -> Arc<Self> {
        let (tx, rx) = watch::channel(accounts.clone());
        Arc::new(Self {
            accounts,
            ledger: Mutex::new(Ledger::default()),
            accounts_rx: rx,
            _accounts_tx: tx,
        })
    }

    pub fn config() -> ContractConfig {
        ContractConfig {
            company: Some(COMPANY_CONTRACT),
            customer_satisfaction: Some(SATISFACTION_CONTRACT),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.ledger.lock().unwrap().calls.clone()
    }

    pub fn bottle_owner(&self, bottle: Address) -> Option<Address> {
        self.ledger
            .lock()
            .unwrap()
            .bottles
            .iter()
            .find(|b| b.address == bottle)
            .map(|b| b.owner)
    }

    fn next_hash(ledger: &mut Ledger) -> TxHash {
        ledger.tx_counter += 1;
        B256::from(keccak256(ledger.tx_counter.to_be_bytes()))
    }

    fn dispatch_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, WalletError> {
        let mut ledger = self.ledger.lock().unwrap();
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| revert("missing selector"))?;

        if to == COMPANY_CONTRACT {
            if selector == Company::bottleNFTIdCall::SELECTOR {
                ledger.calls.push("call bottleNFTId".into());
                let count = U256::from(ledger.bottles.len());
                return Ok(Company::bottleNFTIdCall::abi_encode_returns(&(count,)));
            }
            if selector == Company::getTokenDataCall::SELECTOR {
                ledger.calls.push("call getTokenData".into());
                let args = Company::getTokenDataCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                let Some(bottle) = ledger.bottles.iter().find(|b| b.address == args.bottle)
                else {
                    // absent record: the node answers with empty data
                    return Ok(Vec::new());
                };
                return Ok(Company::getTokenDataCall::abi_encode_returns(&(
                    bottle.name.clone(),
                    bottle.description.clone(),
                    bottle.capacity.clone(),
                    bottle.owner,
                    COMPANY_CONTRACT,
                )));
            }
            if selector == Company::tokenMetadataCall::SELECTOR {
                ledger.calls.push("call Company.tokenMetadata".into());
                let args = Company::tokenMetadataCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                let index = args.token_id.saturating_to::<usize>();
                let Some(bottle) = index.checked_sub(1).and_then(|i| ledger.bottles.get(i))
                else {
                    return Ok(Vec::new());
                };
                return Ok(Company::tokenMetadataCall::abi_encode_returns(&(
                    bottle.name.clone(),
                    bottle.description.clone(),
                    bottle.capacity.clone(),
                    bottle.owner,
                    bottle.address,
                    COMPANY_CONTRACT,
                )));
            }
        }

        if to == SATISFACTION_CONTRACT {
            if selector == CustomerSatisfaction::balanceOfCall::SELECTOR {
                ledger.calls.push("call balanceOf".into());
                let args = CustomerSatisfaction::balanceOfCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                let balance = ledger
                    .certificates
                    .iter()
                    .filter(|c| c.owner == args.owner)
                    .count();
                return Ok(CustomerSatisfaction::balanceOfCall::abi_encode_returns(&(
                    U256::from(balance),
                )));
            }
            if selector == CustomerSatisfaction::getCertificatesByCompanyCall::SELECTOR {
                ledger.calls.push("call getCertificatesByCompany".into());
                let args =
                    CustomerSatisfaction::getCertificatesByCompanyCall::abi_decode(data, true)
                        .map_err(|e| revert(&e.to_string()))?;
                let ids: Vec<U256> = ledger
                    .certificates
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.owner == args.owner)
                    .map(|(i, _)| U256::from(i + 1))
                    .collect();
                return Ok(
                    CustomerSatisfaction::getCertificatesByCompanyCall::abi_encode_returns(&(
                        ids,
                    )),
                );
            }
            if selector == CustomerSatisfaction::tokenMetadataCall::SELECTOR {
                ledger.calls.push("call Satisfaction.tokenMetadata".into());
                let args = CustomerSatisfaction::tokenMetadataCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                let index = args.token_id.saturating_to::<usize>();
                let Some(cert) = index.checked_sub(1).and_then(|i| ledger.certificates.get(i))
                else {
                    return Ok(Vec::new());
                };
                return Ok(CustomerSatisfaction::tokenMetadataCall::abi_encode_returns(
                    &(cert.owner, cert.company, cert.bottle),
                ));
            }
            if selector == CustomerSatisfaction::mintedSatisfTokenCall::SELECTOR {
                ledger.calls.push("call mintedSatisfToken".into());
                let args = CustomerSatisfaction::mintedSatisfTokenCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                let id = ledger
                    .certificates
                    .iter()
                    .position(|c| c.bottle == args.bottle)
                    .map(|i| i + 1)
                    .unwrap_or(0);
                return Ok(CustomerSatisfaction::mintedSatisfTokenCall::abi_encode_returns(
                    &(U256::from(id),),
                ));
            }
        }

        Err(revert("unknown call target"))
    }

    fn dispatch_transaction(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
    ) -> Result<TxHash, WalletError> {
        let mut ledger = self.ledger.lock().unwrap();
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| revert("missing selector"))?;

        if to == COMPANY_CONTRACT {
            if selector == Company::registerBottleAddressCall::SELECTOR {
                ledger.calls.push("tx registerBottleAddress".into());
                let args = Company::registerBottleAddressCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                if !ledger.registered.insert(args.bottle) {
                    return Err(revert("bottle address already registered"));
                }
                return Ok(Self::next_hash(&mut ledger));
            }
            if selector == Company::mintCall::SELECTOR {
                ledger.calls.push("tx Company.mint".into());
                let args = Company::mintCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                if !ledger.registered.contains(&args.bottle) {
                    return Err(revert("bottle address not registered"));
                }
                if ledger.bottles.iter().any(|b| b.address == args.bottle) {
                    return Err(revert("bottle already minted"));
                }
                ledger.bottles.push(Bottle {
                    name: args.name,
                    description: args.description,
                    capacity: args.capacity,
                    owner: from,
                    address: args.bottle,
                });
                return Ok(Self::next_hash(&mut ledger));
            }
            if selector == Company::setAddressOwnerCall::SELECTOR {
                ledger.calls.push("tx setAddressOwner".into());
                let args = Company::setAddressOwnerCall::abi_decode(data, true)
                    .map_err(|e| revert(&e.to_string()))?;
                let Some(bottle) = ledger.bottles.iter_mut().find(|b| b.address == from) else {
                    return Err(revert("sender is not a minted bottle"));
                };
                bottle.owner = args.new_owner;
                return Ok(Self::next_hash(&mut ledger));
            }
        }

        if to == SATISFACTION_CONTRACT
            && selector == CustomerSatisfaction::mintCall::SELECTOR
        {
            ledger.calls.push("tx Satisfaction.mint".into());
            let args = CustomerSatisfaction::mintCall::abi_decode(data, true)
                .map_err(|e| revert(&e.to_string()))?;
            if ledger.certificates.iter().any(|c| c.bottle == args.bottle) {
                return Err(revert("certificate already minted for this bottle"));
            }
            ledger.certificates.push(Certificate {
                owner: from,
                company: args.company,
                bottle: args.bottle,
            });
            return Ok(Self::next_hash(&mut ledger));
        }

        Err(revert("unknown transaction target"))
    }

    /// Decode a raw EIP-155 legacy transaction, recover the sender from its
    /// signature, and apply it as a normal transaction.
    fn apply_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, WalletError> {
        let mut reader = RlpReader::new(raw);
        reader.enter_list();
        let nonce = reader.item();
        let gas_price = reader.item();
        let gas_limit = reader.item();
        let to_bytes = reader.item();
        let value = reader.item();
        let data = reader.item();
        let v = be_u64(&reader.item());
        let r = reader.item();
        let s = reader.item();

        assert!(v >= 37, "transaction is not EIP-155 protected");
        let chain_id = (v - 35) / 2;
        assert_eq!(chain_id, CHAIN_ID, "transaction signed for the wrong chain");
        let recovery = RecoveryId::from_byte((v - 35 - chain_id * 2) as u8)
            .expect("recovery id is 0 or 1");

        // rebuild the signing preimage and recover the sender
        let mut payload = Vec::new();
        rlp_append(&mut payload, &nonce);
        rlp_append(&mut payload, &gas_price);
        rlp_append(&mut payload, &gas_limit);
        rlp_append(&mut payload, &to_bytes);
        rlp_append(&mut payload, &value);
        rlp_append(&mut payload, &data);
        rlp_append_uint(&mut payload, &chain_id.to_be_bytes());
        rlp_append(&mut payload, &[]);
        rlp_append(&mut payload, &[]);
        let sighash = keccak256(rlp_list(payload));

        let mut rs = [0u8; 64];
        rs[32 - r.len()..32].copy_from_slice(&r);
        rs[64 - s.len()..].copy_from_slice(&s);
        let signature = Signature::from_slice(&rs).expect("well-formed signature");
        let key = VerifyingKey::recover_from_prehash(sighash.as_slice(), &signature, recovery)
            .expect("recoverable signature");
        let sender = Address::from_raw_public_key(&key.to_encoded_point(false).as_bytes()[1..]);

        let to = Address::from_slice(&to_bytes);
        self.dispatch_transaction(sender, to, &data)
    }
}

impl WalletProvider for MockChain {
    fn accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, WalletError>> {
        let accounts = self.accounts.clone();
        Box::pin(async move { Ok(accounts) })
    }

    fn request_accounts(&self) -> BoxFuture<'_, Result<Vec<Address>, WalletError>> {
        self.accounts()
    }

    fn call(&self, to: Address, data: Vec<u8>) -> BoxFuture<'_, Result<Vec<u8>, WalletError>> {
        let result = self.dispatch_call(to, &data);
        Box::pin(async move { result })
    }

    fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> BoxFuture<'_, Result<TxHash, WalletError>> {
        let result = self.dispatch_transaction(from, to, &data);
        Box::pin(async move { result })
    }

    fn send_raw_transaction(&self, raw: Vec<u8>) -> BoxFuture<'_, Result<TxHash, WalletError>> {
        let result = self.apply_raw_transaction(&raw);
        Box::pin(async move { result })
    }

    fn await_confirmation(&self, _tx: TxHash) -> BoxFuture<'_, Result<(), WalletError>> {
        Box::pin(async { Ok(()) })
    }

    fn chain_id(&self) -> BoxFuture<'_, Result<u64, WalletError>> {
        Box::pin(async { Ok(CHAIN_ID) })
    }

    fn transaction_count(&self, _account: Address) -> BoxFuture<'_, Result<u64, WalletError>> {
        Box::pin(async { Ok(0) })
    }

    fn gas_price(&self) -> BoxFuture<'_, Result<U256, WalletError>> {
        Box::pin(async { Ok(U256::from(1_000_000_000u64)) })
    }

    fn watch_accounts(&self) -> watch::Receiver<Vec<Address>> {
        self.accounts_rx.clone()
    }
}

// ===== Minimal RLP, test side =====

struct RlpReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RlpReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn length(&mut self, base: u8) -> usize {
        let prefix = self.buf[self.pos];
        self.pos += 1;
        let short = (prefix - base) as usize;
        if short <= 55 {
            return short;
        }
        let lenlen = short - 55;
        let mut len = 0usize;
        for _ in 0..lenlen {
            len = (len << 8) | self.buf[self.pos] as usize;
            self.pos += 1;
        }
        len
    }

    /// Consume the list header, leaving the cursor at the first element.
    fn enter_list(&mut self) {
        assert!(self.buf[self.pos] >= 0xc0, "expected an RLP list");
        self.length(0xc0);
    }

    /// Consume one byte-string item.
    fn item(&mut self) -> Vec<u8> {
        let prefix = self.buf[self.pos];
        assert!(prefix < 0xc0, "expected an RLP byte string");
        if prefix < 0x80 {
            self.pos += 1;
            return vec![prefix];
        }
        let len = self.length(0x80);
        let out = self.buf[self.pos..self.pos + len].to_vec();
        self.pos += len;
        out
    }
}

fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// RLP-encode an unsigned integer given as big-endian bytes.
fn rlp_append_uint(out: &mut Vec<u8>, be: &[u8]) {
    let start = be.iter().position(|&b| b != 0).unwrap_or(be.len());
    rlp_append(out, &be[start..]);
}

fn rlp_append(out: &mut Vec<u8>, bytes: &[u8]) {
    match bytes.len() {
        1 if bytes[0] < 0x80 => out.push(bytes[0]),
        len if len <= 55 => {
            out.push(0x80 + len as u8);
            out.extend_from_slice(bytes);
        }
        len => {
            out.push(0xb8);
            out.push(len as u8);
            out.extend_from_slice(bytes);
        }
    }
}

fn rlp_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::new();
    if payload.len() <= 55 {
        out.push(0xc0 + payload.len() as u8);
    } else {
        let len = payload.len();
        if len <= 0xff {
            out.push(0xf8);
            out.push(len as u8);
        } else {
            out.push(0xf9);
            out.push((len >> 8) as u8);
            out.push((len & 0xff) as u8);
        }
    }
    out.extend_from_slice(&payload);
    out
}
