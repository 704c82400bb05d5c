#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PulseError {
    #[error("experience amount must be greater than 0")]
    ZeroAmount,
    #[error("pulse is sealed and can no longer be modified")]
    Sealed,
    #[error("pulse was already sealed at {0}")]
    AlreadySealed(String),
    #[error("only sealed pulses can be queued for delivery")]
    NotSealed,
}
