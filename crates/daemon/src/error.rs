//! The top-level error a daemon's `run` entry point can fail with.

use thiserror::Error;

/// Failure modes surfaced at the CLI boundary, mapped to the process
/// exit codes documented in the external interfaces section: 1 config
/// error, 2 bind error, 3 other fatal runtime error.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The configuration file was missing, malformed, or missing a key.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    /// The acceptor could not bind its listening address.
    #[error("failed to bind: {0}")]
    Bind(std::io::Error),
    /// A connection-level or account-store error reached the top level
    /// unrecovered.
    #[error("runtime error: {0}")]
    Net(#[from] net::ConnError),
    /// The account store failed in a way the daemon cannot recover from.
    #[error("account store error: {0}")]
    Account(#[from] accounts::AccountError),
    /// Logging could not be initialised (e.g. the log directory cannot
    /// be created).
    #[error("failed to initialise logging: {0}")]
    Logging(std::io::Error),
    /// This daemon's own key material, or a peer's, could not be loaded
    /// from configuration.
    #[error("crypt key material error: {0}")]
    Crypt(#[from] crypt::CryptError),
}

impl DaemonError {
    /// The process exit code this error maps to.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Crypt(_) => 1,
            Self::Bind(_) => 2,
            Self::Net(_) | Self::Account(_) | Self::Logging(_) => 3,
        }
    }
}
