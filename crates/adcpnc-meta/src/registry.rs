use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::{FormatAttempt, MetadataError};
use crate::formats::{GlobalAttributeFormat, TomlFormat};
use crate::model::Attributes;

pub trait MetadataFormat {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<Attributes, MetadataError>;
}

pub fn parse_metadata(content: &str) -> Result<Attributes, MetadataError> {
    let toml_format = TomlFormat;
    let global_atts = GlobalAttributeFormat;
    let formats: [&dyn MetadataFormat; 2] = [&toml_format, &global_atts];
    parse_with_formats(content, &formats)
}

pub fn parse_with_formats(
    content: &str,
    formats: &[&dyn MetadataFormat],
) -> Result<Attributes, MetadataError> {
    let mut attempts = Vec::new();

    for format in formats {
        match format.parse(content) {
            Ok(parsed) => {
                debug!(format = format.name(), keys = parsed.len(), "parsed metadata");
                return Ok(parsed);
            }
            Err(MetadataError::FormatMismatch { reason, .. }) => {
                attempts.push(FormatAttempt::new(format.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(MetadataError::NoMatchingFormat { attempts })
}

pub fn read_metadata_file(path: impl AsRef<Path>) -> Result<Attributes, MetadataError> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_metadata(&content)
}
