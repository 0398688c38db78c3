mod common;
mod global_atts;
mod toml_table;

pub use global_atts::GlobalAttributeFormat;
pub use toml_table::TomlFormat;

pub use common::{coerce_value, parse_number_list};
