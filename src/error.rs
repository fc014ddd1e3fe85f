use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncentiveErrorKind {
    Configuration,
    InvalidContract,
    Store,
    Arithmetic,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveError {
    pub kind: IncentiveErrorKind,
    pub message: String,
}

impl IncentiveError {
    pub fn new(kind: IncentiveErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for IncentiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IncentiveError {}

pub fn configuration_error(message: impl Into<String>) -> IncentiveError {
    IncentiveError::new(IncentiveErrorKind::Configuration, message)
}

pub fn invalid_contract(message: impl Into<String>) -> IncentiveError {
    IncentiveError::new(IncentiveErrorKind::InvalidContract, message)
}

pub fn store_error(message: impl Into<String>) -> IncentiveError {
    IncentiveError::new(IncentiveErrorKind::Store, message)
}

pub fn arithmetic_error(message: impl Into<String>) -> IncentiveError {
    IncentiveError::new(IncentiveErrorKind::Arithmetic, message)
}

pub fn internal_error(message: impl Into<String>) -> IncentiveError {
    IncentiveError::new(IncentiveErrorKind::Internal, message)
}
