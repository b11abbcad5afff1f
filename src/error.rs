use alloy::primitives::B256;
use alloy::transports::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindingError>;

#[derive(Debug, Error)]
pub enum BindingError {
    /// Error reported by the RPC provider, passed through untouched
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No receipt showed up before the synchronization timeout. `seconds`
    /// keeps its fraction, e.g. "1.5".
    #[error("Transaction {tx} wasn't processed in {seconds} seconds!")]
    Timeout { tx: B256, seconds: f64 },

    #[error("{contract} error: Please call set_provider() first before calling deploy().")]
    MissingProvider { contract: String },

    #[error("{contract} error: contract binary not set. Can't deploy new instance.")]
    MissingBinary { contract: String },

    #[error("{contract} contains unresolved libraries. You must deploy and link the following libraries before you can deploy a new version of {contract}: {libraries}")]
    UnresolvedLibraries { contract: String, libraries: String },

    #[error("Invalid address passed to {contract}.at(): {address}")]
    InvalidAddress { contract: String, address: String },

    #[error("Cannot find deployed address: {contract} not deployed or address not set.")]
    NotDeployed { contract: String },

    #[error("{contract} error: Can't find artifacts for network id '{network}'")]
    UnknownNetwork { contract: String, network: String },

    #[error("Cannot link contract {library} without an address.")]
    LinkWithoutAddress { library: String },

    #[error("Function '{function}' not found in {contract} ABI")]
    UnknownFunction { contract: String, function: String },

    #[error("Deployment transaction {tx} did not create a contract")]
    MissingContractAddress { tx: B256 },

    /// Arguments or return data that could not be ABI encoded/decoded
    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid artifact: {0}")]
    Artifact(String),

    #[error("{0}")]
    InvalidParams(String),
}

impl BindingError {
    /// Errors raised before anything is dispatched to the provider.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingProvider { .. }
                | Self::MissingBinary { .. }
                | Self::UnresolvedLibraries { .. }
                | Self::InvalidAddress { .. }
                | Self::NotDeployed { .. }
                | Self::UnknownNetwork { .. }
                | Self::LinkWithoutAddress { .. }
        )
    }
}

impl From<serde_json::Error> for BindingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Artifact(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_tx_and_seconds() {
        let err = BindingError::Timeout {
            tx: B256::repeat_byte(0xab),
            seconds: 240.0,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Transaction 0xabab"));
        assert!(msg.ends_with("wasn't processed in 240 seconds!"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_timeout_message_keeps_fractional_seconds() {
        let err = BindingError::Timeout {
            tx: B256::repeat_byte(1),
            seconds: 1.5,
        };
        assert!(err.to_string().ends_with("wasn't processed in 1.5 seconds!"));
    }

    #[test]
    fn test_configuration_classification() {
        let err = BindingError::NotDeployed {
            contract: "Offer".to_string(),
        };
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Cannot find deployed address: Offer not deployed or address not set."
        );
    }
}
