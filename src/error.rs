//! Error types for protocol layers.
use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the attribute, dictionary and factory boundaries.
///
/// All of them are local to the call that produced them: fix the input and call again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mode (or other enumeration) string that is not one of the declared variants.
    #[error("{value:?} is not a valid mode, must be one of: {expected}")]
    InvalidMode { value: String, expected: String },

    /// A dictionary key that the protocol does not declare.
    #[error("unknown attribute {key:?} for protocol {protocol}")]
    UnknownKey { protocol: String, key: String },

    /// A dictionary value of the wrong type or that cannot be parsed.
    #[error("invalid value for {key:?}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// A value or a step that does not fit in the attribute bit width.
    #[error("value {value} does not fit in {attribute} (max {max})")]
    ValueOutOfRange {
        attribute: String,
        value: u64,
        max: u64,
    },

    /// A malformed MAC or IPv4 address string.
    #[error("invalid {kind} address {value:?}")]
    InvalidAddress { kind: &'static str, value: String },

    /// A declared mode that the attribute cannot carry.
    #[error("mode {mode} is not supported by {attribute}")]
    UnsupportedMode { attribute: String, mode: String },

    /// No protocol is registered for this identifier.
    #[error("unknown protocol id {0}")]
    UnknownProtocol(u16),

    /// A layer stack already holds this protocol.
    #[error("{0} found twice in layers")]
    DuplicateLayer(String),
}

impl Error {
    pub(crate) fn invalid_value(key: &str, reason: impl ToString) -> Self {
        Error::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;

    #[test]
    fn test_error_display() {
        let error = Error::InvalidMode {
            value: "SIDEWAYS".to_string(),
            expected: "FIXED,INCREMENT,DECREMENT,RANDOM".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "\"SIDEWAYS\" is not a valid mode, must be one of: FIXED,INCREMENT,DECREMENT,RANDOM"
        );
        assert_eq!(
            Error::DuplicateLayer("IPv4".to_string()).to_string(),
            "IPv4 found twice in layers"
        );
    }
}
