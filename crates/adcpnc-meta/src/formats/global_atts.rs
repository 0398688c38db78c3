use csv::{ReaderBuilder, Trim};

use crate::errors::MetadataError;
use crate::formats::common::coerce_value;
use crate::model::Attributes;
use crate::registry::MetadataFormat;

const FORMAT_NAME: &str = "global_attributes";

/// Semicolon delimited `key; value` rows, one attribute per row. Lines
/// starting with `#` are comments.
pub struct GlobalAttributeFormat;

impl MetadataFormat for GlobalAttributeFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn parse(&self, content: &str) -> Result<Attributes, MetadataError> {
        if !content.lines().any(|line| line.contains(';')) {
            return Err(MetadataError::FormatMismatch {
                format: FORMAT_NAME,
                reason: "no `key; value` rows found".to_string(),
            });
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(content.as_bytes());

        let mut attributes = Attributes::new();
        for result in reader.records() {
            let record = result.map_err(|source| MetadataError::Csv {
                format: FORMAT_NAME,
                source,
            })?;
            let line_index = record.position().map(|pos| pos.line()).unwrap_or(0) as usize;

            let key = record.get(0).unwrap_or_default();
            if key.is_empty() {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                return Err(MetadataError::InvalidRow {
                    format: FORMAT_NAME,
                    line_index,
                    message: "row has a value but no key".to_string(),
                });
            }
            if record.len() < 2 {
                return Err(MetadataError::InvalidRow {
                    format: FORMAT_NAME,
                    line_index,
                    message: format!("key '{key}' has no value"),
                });
            }

            // Values may themselves contain the delimiter.
            let value: Vec<&str> = record.iter().skip(1).collect();
            let value = value.join("; ");
            attributes.insert(key, coerce_value(key, &value));
        }

        if attributes.is_empty() {
            return Err(MetadataError::Empty {
                format: FORMAT_NAME,
            });
        }

        Ok(attributes)
    }
}
