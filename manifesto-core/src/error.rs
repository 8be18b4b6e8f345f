use thiserror::Error;

use crate::encode::EncodeError;

#[derive(Debug, Error)]
pub enum Error {
    /// Anything wrong with the source text or its header: bad sections,
    /// missing fields, unparsable numbers, unsupported version.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! invalid {
    ($($arg:tt)*) => {
        $crate::error::Error::InvalidManifest(format!($($arg)*))
    };
}

pub(crate) use invalid;
