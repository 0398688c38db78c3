use crate::model::AttrValue;

/// Keys whose values stay text even when they look numeric.
pub const TEXT_ONLY_KEYS: [&str; 1] = ["MOORING"];

/// Coerces a raw metadata value: bracketed or comma separated lists of
/// numbers become `Numbers`, a lone number becomes `Number`, anything else
/// stays text.
pub fn coerce_value(key: &str, raw: &str) -> AttrValue {
    let trimmed = raw.trim();
    if TEXT_ONLY_KEYS.contains(&key) {
        return AttrValue::Text(trimmed.to_string());
    }

    if let Ok(number) = trimmed.parse::<f64>() {
        return AttrValue::Number(number);
    }

    if trimmed.starts_with('[') {
        if let Some(numbers) = parse_number_list(trimmed) {
            return AttrValue::Numbers(numbers);
        }
    }

    AttrValue::Text(trimmed.to_string())
}

/// Parses `[a, b]`, `[[a, b], [c, d]]` and similar nestings into a flat list.
pub fn parse_number_list(raw: &str) -> Option<Vec<f64>> {
    let cleaned: String = raw
        .chars()
        .map(|ch| if ch == '[' || ch == ']' || ch == '(' || ch == ')' { ' ' } else { ch })
        .collect();

    let numbers: Result<Vec<f64>, _> = cleaned
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::parse::<f64>)
        .collect();

    match numbers {
        Ok(values) if !values.is_empty() => Some(values),
        _ => None,
    }
}
