//! Application error type.
//!
//! Wraps the error enums of every layer so CLI commands and HTTP handlers can
//! report them through one type.

use crate::config::ConfigError;
use crate::explorer::ExploreError;
use crate::ledger::LedgerError;
use axum::http::StatusCode;
use fundflow_core::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Explore(#[from] ExploreError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// HTTP status reported for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::Ledger(e) => ledger_status(e),
            AppError::Explore(ExploreError::Ledger(e)) => ledger_status(e),
            AppError::Explore(ExploreError::Graph(e)) | AppError::Flow(e) => flow_status(e),
            AppError::Explore(ExploreError::AlreadyLoading(_)) => StatusCode::CONFLICT,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn ledger_status(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Transient(_) | LedgerError::Malformed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn flow_status(error: &FlowError) -> StatusCode {
    match error {
        FlowError::NodeNotFound(_) => StatusCode::NOT_FOUND,
        FlowError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
        FlowError::InvalidAmount { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundflow_core::Address;

    #[test]
    fn status_codes() {
        let busy = AppError::from(ExploreError::AlreadyLoading(Address::new("ckb1a")));
        assert_eq!(busy.status_code(), StatusCode::CONFLICT);

        let bad = AppError::from(ExploreError::from(LedgerError::InvalidAddress("x".into())));
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let missing = AppError::from(FlowError::NodeNotFound(Address::new("ckb1b")));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let down = AppError::from(LedgerError::Transient("timeout".into()));
        assert_eq!(down.status_code(), StatusCode::BAD_GATEWAY);
    }
}
