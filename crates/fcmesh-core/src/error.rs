//! Wire-format error types.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("runt frame: need {min} bytes, got {actual}")]
    Runt { min: usize, actual: usize },

    #[error("declared address length {declared} exceeds frame length {actual}")]
    TruncatedAddress { declared: usize, actual: usize },

    #[error("address length {0} below header size")]
    AddressTooShort(usize),

    #[error("beacon payload too short: need {min} bytes, got {actual}")]
    BeaconTooShort { min: usize, actual: usize },

    #[error("unknown peer event kind: {0}")]
    UnknownEventKind(u32),

    #[error("peer event too short: need {min} bytes, got {actual}")]
    EventTooShort { min: usize, actual: usize },
}
