pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{FormatAttempt, MetadataError};
pub use model::{AttrValue, Attributes};
pub use registry::{parse_metadata, parse_with_formats, read_metadata_file, MetadataFormat};
