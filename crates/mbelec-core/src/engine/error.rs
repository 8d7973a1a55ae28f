use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::cell::BoxError;
use crate::core::models::topology::TopologyError;

#[derive(Debug, Error)]
pub enum ElectrostaticsError {
    #[error("Inconsistent system description: {source}")]
    Configuration {
        #[from]
        source: TopologyError,
    },

    #[error("Electrostatics has not been initialized")]
    NotInitialized,

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Invalid engine configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

impl ElectrostaticsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ElectrostaticsError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

impl From<BoxError> for ElectrostaticsError {
    fn from(err: BoxError) -> Self {
        ElectrostaticsError::invalid("periodic_box", err.to_string())
    }
}
