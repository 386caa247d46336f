//! Convert BCC (JSON) subtitle documents to SubRip.

pub mod batch;
pub mod bcc;
pub mod convert;
pub mod error;
pub mod srt;

pub use convert::{convert, convert_with, ConversionResult, ConvertOptions};
pub use error::{ConversionError, ErrorKind};
