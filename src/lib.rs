//! Bottle provenance workflows against a pair of external NFT contracts.
//!
//! A physical bottle is represented on-chain by a generated key pair: the
//! address is its persistent identifier, and the private key (printed on the
//! label as a QR code) is the sole credential for claiming ownership.  The
//! **company** contract registers bottle addresses and records descriptive
//! metadata; the **satisfaction** contract mints at most one customer
//! certificate per bottle.
//!
//! The crate is organized around three workflows sharing an explicit
//! [`WorkflowContext`] (wallet provider + contract configuration + connected
//! account):
//!
//! - [`workflows::CompanyWorkflow`]: register a bottle address, mint its NFT,
//!   and produce the printable label.
//! - [`workflows::TransferWorkflow`]: validate a scanned key, look up the
//!   bottle record, and transfer ownership to the connected account using a
//!   transaction signed by the bottle's own key.
//! - [`workflows::CertificateWorkflow`]: enumerate owned bottles and mint or
//!   list satisfaction certificates.
//!
//! All chain access goes through the [`provider::WalletProvider`] capability
//! trait; [`provider::RpcWalletProvider`] is the JSON-RPC implementation.

pub mod config;
pub mod contracts;
pub mod error;
pub mod identity;
pub mod label;
pub mod provider;
pub mod session;
pub mod status;
pub mod tx;
pub mod workflows;

pub use config::{ConfigStore, ContractConfig};
pub use error::WorkflowError;
pub use identity::{BottleIdentity, BottleKey};
pub use provider::{RpcProviderConfig, RpcWalletProvider, WalletProvider};
pub use session::WalletSession;
pub use status::TxStatus;
pub use workflows::WorkflowContext;
