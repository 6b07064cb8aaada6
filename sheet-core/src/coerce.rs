//! Lenient deserializers for saved character sheets.
//!
//! Sheets on disk come from hand edits, older releases and other tools. A
//! numeric field holding `"12"`, `null` or `"abc"` must never fail the whole
//! load, so every numeric field goes through one of these helpers and falls
//! back to a safe default instead.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Read a finite number out of a JSON value, accepting numeric strings.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Coerce a JSON value to an integer, or return `fallback`.
pub fn int_or(value: &Value, fallback: i32) -> i32 {
    number(value)
        .map(|n| n.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
        .unwrap_or(fallback)
}

/// Coerce a JSON value to a non-negative integer, or return `fallback`.
pub fn uint_or(value: &Value, fallback: u32) -> u32 {
    number(value)
        .map(|n| n.trunc().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(fallback)
}

pub fn int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(int_or(&value, 0))
}

pub fn uint<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(uint_or(&value, 0))
}

/// Small unsigned values such as levels; out-of-range input saturates.
pub fn small<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(uint_or(&value, 0).min(u8::MAX as u32) as u8)
}

pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).map(|_| int_or(&value, 0)))
}

pub fn opt_small<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).map(|_| uint_or(&value, 0).min(u8::MAX as u32) as u8))
}

/// Strings, with numbers stringified and anything else emptied.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Optional strings; empty strings and non-strings become `None`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Deserialize `T`, falling back to `T::default()` when the value doesn't fit.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A list where malformed entries are dropped rather than failing the list.
pub fn entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A string-keyed map of integers whose keys deserialize as `K`.
///
/// Entries with unknown keys are dropped; values are coerced like [`int`].
pub fn keyed_ints<'de, D, K>(deserializer: D) -> Result<BTreeMap<K, i32>, D::Error>
where
    D: Deserializer<'de>,
    K: DeserializeOwned + Ord,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, v)| {
            let key = serde_json::from_value::<K>(Value::String(key)).ok()?;
            Some((key, int_or(&v, 0)))
        })
        .collect())
}

/// Per-spell-level caps keyed by the level as a string (`{"1": 4}`).
pub fn level_caps<'de, D>(deserializer: D) -> Result<BTreeMap<u8, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, v)| {
            let level = key.trim().parse::<u8>().ok()?;
            Some((level, uint_or(&v, 0)))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "int")]
        hp: i32,
        #[serde(default, deserialize_with = "uint")]
        quantity: u32,
        #[serde(default, deserialize_with = "opt_int")]
        cap: Option<i32>,
        #[serde(default, deserialize_with = "entries")]
        tags: Vec<u32>,
    }

    fn probe(value: Value) -> Probe {
        serde_json::from_value(value).expect("lenient probe always parses")
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        let p = probe(json!({ "hp": "12", "quantity": " 3 " }));
        assert_eq!(p.hp, 12);
        assert_eq!(p.quantity, 3);
    }

    #[test]
    fn test_garbage_numbers_fall_back_to_zero() {
        let p = probe(json!({ "hp": "NaN", "quantity": null, "cap": "abc" }));
        assert_eq!(p.hp, 0);
        assert_eq!(p.quantity, 0);
        assert_eq!(p.cap, None);
    }

    #[test]
    fn test_negative_quantity_saturates_at_zero() {
        let p = probe(json!({ "quantity": -4 }));
        assert_eq!(p.quantity, 0);
    }

    #[test]
    fn test_fractions_truncate() {
        let p = probe(json!({ "hp": 7.9, "cap": -2.5 }));
        assert_eq!(p.hp, 7);
        assert_eq!(p.cap, Some(-2));
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let p = probe(json!({ "tags": [1, "two", 3, null] }));
        assert_eq!(p.tags, vec![1, 3]);

        let p = probe(json!({ "tags": "not a list" }));
        assert!(p.tags.is_empty());
    }

    #[test]
    fn test_level_caps() {
        #[derive(Deserialize)]
        struct Caps {
            #[serde(deserialize_with = "level_caps")]
            caps: BTreeMap<u8, u32>,
        }
        let caps: Caps =
            serde_json::from_value(json!({ "caps": { "1": 4, "2": "3", "x": 9 } })).unwrap();
        assert_eq!(caps.caps.get(&1), Some(&4));
        assert_eq!(caps.caps.get(&2), Some(&3));
        assert_eq!(caps.caps.len(), 2);
    }
}
