//! Client-side binding for the `Offer` contract: deploy, locate and invoke it
//! over JSON-RPC, wait for transactions to be mined and decode the events
//! they emit.

pub mod config;
pub mod error;
pub mod ethereum;
pub mod offer;

pub use config::BindingConfig;
pub use error::{BindingError, Result};
pub use ethereum::{
    abi::Artifact,
    confirm::SyncOptions,
    contract::{ContractClass, ContractInstance},
    events::DecodedEvent,
    params::TxParams,
    provider::{RpcTransport, Transport},
    Confirmation, Invocation, Receipt,
};
