pub mod descriptor;
pub mod encode;
pub mod error;
pub mod mnfs;
pub mod record;

pub use encode::{EncodeError, Manifest, ManifestEncoder};
pub use error::{Error, Result};
pub use record::{compile, Record, VidPid};
