use toml::{Table, Value};

use crate::errors::MetadataError;
use crate::formats::common::TEXT_ONLY_KEYS;
use crate::model::{AttrValue, Attributes};
use crate::registry::MetadataFormat;

const FORMAT_NAME: &str = "toml";

/// A flat TOML table using the same keys as the global attribute file.
pub struct TomlFormat;

impl MetadataFormat for TomlFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn parse(&self, content: &str) -> Result<Attributes, MetadataError> {
        let table: Table = content
            .parse()
            .map_err(|err: toml::de::Error| MetadataError::FormatMismatch {
                format: FORMAT_NAME,
                reason: err.message().to_string(),
            })?;

        let mut attributes = Attributes::new();
        for (key, value) in &table {
            attributes.insert(key.clone(), convert_value(key, value)?);
        }

        if attributes.is_empty() {
            return Err(MetadataError::Empty {
                format: FORMAT_NAME,
            });
        }

        Ok(attributes)
    }
}

fn convert_value(key: &str, value: &Value) -> Result<AttrValue, MetadataError> {
    let converted = match value {
        Value::String(text) => AttrValue::Text(text.clone()),
        Value::Integer(number) if TEXT_ONLY_KEYS.contains(&key) => {
            AttrValue::Text(number.to_string())
        }
        Value::Integer(number) => AttrValue::Number(*number as f64),
        Value::Float(number) => AttrValue::Number(*number),
        Value::Boolean(flag) => AttrValue::Number(if *flag { 1.0 } else { 0.0 }),
        Value::Datetime(datetime) => AttrValue::Text(datetime.to_string()),
        Value::Array(items) => {
            let mut numbers = Vec::new();
            flatten_numbers(key, items, &mut numbers)?;
            AttrValue::Numbers(numbers)
        }
        Value::Table(_) => {
            return Err(MetadataError::InvalidValue {
                key: key.to_string(),
                message: "nested tables are not supported".to_string(),
            })
        }
    };
    Ok(converted)
}

fn flatten_numbers(key: &str, items: &[Value], out: &mut Vec<f64>) -> Result<(), MetadataError> {
    for item in items {
        match item {
            Value::Integer(number) => out.push(*number as f64),
            Value::Float(number) => out.push(*number),
            Value::Array(nested) => flatten_numbers(key, nested, out)?,
            other => {
                return Err(MetadataError::InvalidValue {
                    key: key.to_string(),
                    message: format!("arrays may only hold numbers, found {}", other.type_str()),
                })
            }
        }
    }
    Ok(())
}
