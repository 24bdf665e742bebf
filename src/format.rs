use thiserror::Error;

#[derive(Debug, Error)]
pub enum TapError {
    #[error("invalid bank page {0}: expected 0-7")]
    InvalidBankPage(i64),
    #[error("invalid special paging mode {0}: expected 0-3")]
    InvalidSpecialMode(i64),
    #[error("invalid target variable '{0}': expected a letter")]
    InvalidVariable(char),
    #[error("address {0} does not fit in 16 bits")]
    AddressOutOfRange(i64),
    #[error("payload of {0} bytes does not fit in a tape block")]
    PayloadTooLarge(usize),
    #[error("malformed header block: {0}")]
    MalformedHeader(&'static str),
    #[error("body declares {declared} attached bytes but {actual} were supplied")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("nothing to relocate: the payload is empty")]
    EmptyRelocation,
    #[error("payload ended after {actual} of {expected} bytes")]
    ShortPayload { expected: usize, actual: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn address_from_i64(value: i64) -> Result<u16, TapError> {
    u16::try_from(value).map_err(|_| TapError::AddressOutOfRange(value))
}

pub mod tap;
