#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("value {value} out of range ({min}..{max})")]
    OutOfRange {
        value: usize,
        min: usize,
        max: usize,
    },
    #[error(transparent)]
    Bus(#[from] canbus::BusError),
}
