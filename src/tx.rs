//! Minimal legacy-transaction signing for the bottle-key transfer path.
//!
//! Ownership transfers are signed by the bottle's own private key, not by the
//! connected wallet, so they cannot go through the provider's account-based
//! `eth_sendTransaction`.  This module RLP-encodes a legacy (EIP-155)
//! transaction, hashes it, signs with a recoverable ECDSA signature, and
//! yields raw bytes for `eth_sendRawTransaction`.

use alloy_primitives::{keccak256, Address, U256};
use k256::ecdsa::SigningKey;

/// Gas limit used for bottle-key signed transfers.
pub const TRANSFER_GAS_LIMIT: u64 = 300_000;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("transaction signing failed: {0}")]
    Sign(#[from] k256::ecdsa::Error),
}

/// An unsigned legacy transaction.
#[derive(Debug, Clone)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    /// Sign with EIP-155 replay protection and return the raw encoded bytes.
    pub fn sign(&self, key: &SigningKey, chain_id: u64) -> Result<Vec<u8>, SigningError> {
        let sighash = keccak256(self.encode_unsigned(chain_id));
        let (signature, recovery_id) = key.sign_prehash_recoverable(sighash.as_slice())?;
        let v = chain_id * 2 + 35 + u64::from(recovery_id.to_byte());

        let rs = signature.to_bytes();
        let mut payload = Vec::with_capacity(self.data.len() + 128);
        self.append_body(&mut payload);
        append_uint_bytes(&mut payload, &v.to_be_bytes());
        append_uint_bytes(&mut payload, &rs[..32]);
        append_uint_bytes(&mut payload, &rs[32..]);
        Ok(finish_list(payload))
    }

    /// RLP of `[nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0]`,
    /// the EIP-155 signing preimage.
    fn encode_unsigned(&self, chain_id: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.data.len() + 96);
        self.append_body(&mut payload);
        append_uint_bytes(&mut payload, &chain_id.to_be_bytes());
        append_uint_bytes(&mut payload, &[]);
        append_uint_bytes(&mut payload, &[]);
        finish_list(payload)
    }

    fn append_body(&self, out: &mut Vec<u8>) {
        append_uint_bytes(out, &self.nonce.to_be_bytes());
        append_uint_bytes(out, &self.gas_price.to_be_bytes::<32>());
        append_uint_bytes(out, &self.gas_limit.to_be_bytes());
        append_bytes(out, self.to.as_slice());
        append_uint_bytes(out, &self.value.to_be_bytes::<32>());
        append_bytes(out, &self.data);
    }
}

/// RLP-encode a byte string item.
fn append_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    match bytes.len() {
        1 if bytes[0] < 0x80 => out.push(bytes[0]),
        len if len <= 55 => {
            out.push(0x80 + len as u8);
            out.extend_from_slice(bytes);
        }
        len => {
            let len_bytes = (len as u64).to_be_bytes();
            let len_be = trim_leading_zeros(&len_bytes);
            out.push(0xb7 + len_be.len() as u8);
            out.extend_from_slice(len_be);
            out.extend_from_slice(bytes);
        }
    }
}

/// RLP-encode an unsigned integer given as big-endian bytes (zero encodes as
/// the empty string).
fn append_uint_bytes(out: &mut Vec<u8>, be: &[u8]) {
    append_bytes(out, trim_leading_zeros(be));
}

/// Wrap an already-encoded payload as an RLP list.
fn finish_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    if payload.len() <= 55 {
        out.push(0xc0 + payload.len() as u8);
    } else {
        let len_bytes = (payload.len() as u64).to_be_bytes();
        let len_be = trim_leading_zeros(&len_bytes);
        out.push(0xf7 + len_be.len() as u8);
        out.extend_from_slice(len_be);
    }
    out.extend_from_slice(&payload);
    out
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
