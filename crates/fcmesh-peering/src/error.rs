//! Admin-surface error types.
//!
//! Data-path trouble never surfaces here: malformed wire input is
//! dropped with a debug log, and link health is observable only through
//! state transitions and peer events. These enums cover the calls that
//! have a caller to answer to.

use crate::iface::IfNum;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapError {
    #[error("no such interface: {0}")]
    BadIfNum(IfNum),

    /// The key derives to an address outside the mesh prefix, or is our
    /// own key.
    #[error("public key is not a valid peer key")]
    BadKey,

    #[error("switch out of interface slots")]
    OutOfSpace,

    #[error("internal switch error")]
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BeaconStateError {
    #[error("no such interface: {0}")]
    NoSuchIface(IfNum),

    #[error("invalid beacon state: {0:?}")]
    InvalidState(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisconnectError {
    #[error("no peer with that key")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_error_display() {
        assert_eq!(
            BootstrapError::BadIfNum(IfNum(3)).to_string(),
            "no such interface: if3"
        );
        assert_eq!(
            BootstrapError::BadKey.to_string(),
            "public key is not a valid peer key"
        );
        assert_eq!(
            BootstrapError::OutOfSpace.to_string(),
            "switch out of interface slots"
        );
    }

    #[test]
    fn beacon_state_error_display() {
        assert_eq!(
            BeaconStateError::NoSuchIface(IfNum(9)).to_string(),
            "no such interface: if9"
        );
        assert_eq!(
            BeaconStateError::InvalidState("blink".into()).to_string(),
            "invalid beacon state: \"blink\""
        );
    }

    #[test]
    fn disconnect_error_display() {
        assert_eq!(
            DisconnectError::NotFound.to_string(),
            "no peer with that key"
        );
    }
}
