//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading a config, recipient, or artifact file
    ReadFile(String),
    /// Error writing a file
    WriteFile(String),
    /// Error reading the deploy progress file
    ReadProgress(String),
    /// Error writing the deploy progress file
    WriteProgress(String),
    /// Error parsing a contract build artifact
    ArtifactParsing(String),
    /// Error initializing an RPC client
    ClientInitialization(String),
    /// A connected node reports a chain id other than the expected one
    NetworkMismatch(String),
    /// The deployer configuration is inconsistent
    ConfigValidation(String),
    /// A claim recipient carries a points value outside the entitlement table
    InvalidEntitlement(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// An expected event is absent from a confirmed receipt
    EventDecoding(String),
    /// A cross-chain retryable message failed to reach the redeemed status
    RetryableNotRedeemed(String),
    /// Error de/serializing JSON
    Serde(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
            ScriptError::ReadProgress(s) => write!(f, "error reading deploy progress: {}", s),
            ScriptError::WriteProgress(s) => write!(f, "error writing deploy progress: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::NetworkMismatch(s) => write!(f, "network mismatch: {}", s),
            ScriptError::ConfigValidation(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::InvalidEntitlement(s) => {
                write!(f, "invalid claim entitlement: {}", s)
            }
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::EventDecoding(s) => write!(f, "error decoding event: {}", s),
            ScriptError::RetryableNotRedeemed(s) => {
                write!(f, "retryable message not redeemed: {}", s)
            }
            ScriptError::Serde(s) => write!(f, "error de/serializing JSON: {}", s),
        }
    }
}

impl Error for ScriptError {}
