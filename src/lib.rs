pub mod annotation;
pub mod error;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod types;

pub use error::{DecodeError, Issue};
pub use reader::VcfRecords;
pub use record::{decode, Decoded, Decoder, Record};
