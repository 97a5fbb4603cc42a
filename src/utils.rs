//! Serde helpers that coerce the loosely-typed values LLMs tend to emit
//! (numbers as strings, `"yes"` for booleans, integer ids) into the typed
//! shapes of [`crate::schema`].

use serde::de::{Deserialize, Deserializer, Error};
use serde_json::Value;

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

fn whole_number_from(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    number_from(value).filter(|f| f.fract() == 0.0).map(|f| f as i64)
}

fn bool_from(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    number_from(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected a number, got {}", value)))
}

pub fn req_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    number_from(&value).ok_or_else(|| D::Error::custom(format!("expected a number, got {}", value)))
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    whole_number_from(&value)
        .and_then(|i| i32::try_from(i).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected an integer, got {}", value)))
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    bool_from(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected a boolean, got {}", value)))
}

/// Accepts strings and bare numbers (models often emit `"claim_id": 1001`).
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("expected a string, got {}", other))),
    }
}

/// Quality scores outside 1..=10, or not a whole number, collapse to 0.
pub fn quality_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(whole_number_from(&value)
        .filter(|score| (1..=10).contains(score))
        .map(|score| score as u8)
        .unwrap_or(0))
}

/// Absent or null means `true`; anything unrecognisable means `false`.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(true);
    }
    Ok(bool_from(&value).unwrap_or(false))
}

pub fn default_true() -> bool {
    true
}

/// Free text that may arrive as null or as a bare number.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn routing_priority<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match whole_number_from(&value) {
        Some(p) if (1..=5).contains(&p) => Ok(p as u8),
        _ => Err(D::Error::custom(format!(
            "priority must be an integer between 1 and 5, got {}",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "opt_f64")]
        cost: Option<f64>,
        #[serde(default, deserialize_with = "opt_i32")]
        year: Option<i32>,
        #[serde(default, deserialize_with = "opt_bool")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "opt_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "quality_score")]
        score: u8,
        #[serde(default = "default_true", deserialize_with = "lenient_flag")]
        valid: bool,
    }

    fn fields(json: &str) -> Fields {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_numbers_from_strings() {
        let p = fields(r#"{"cost": "$1,250.50", "year": "2018"}"#);
        assert_eq!(p.cost, Some(1250.5));
        assert_eq!(p.year, Some(2018));
    }

    #[test]
    fn test_blank_and_null_are_absent() {
        let p = fields(r#"{"cost": "", "year": null, "flag": null, "id": null}"#);
        assert_eq!(p.cost, None);
        assert_eq!(p.year, None);
        assert_eq!(p.flag, None);
        assert_eq!(p.id, None);
    }

    #[test]
    fn test_bool_words() {
        assert_eq!(fields(r#"{"flag": "Yes"}"#).flag, Some(true));
        assert_eq!(fields(r#"{"flag": "false"}"#).flag, Some(false));
        assert!(serde_json::from_str::<Fields>(r#"{"flag": "maybe"}"#).is_err());
    }

    #[test]
    fn test_numeric_id_becomes_string() {
        assert_eq!(fields(r#"{"id": 1001}"#).id.as_deref(), Some("1001"));
    }

    #[test]
    fn test_fractional_year_rejected() {
        assert!(serde_json::from_str::<Fields>(r#"{"year": 2018.5}"#).is_err());
    }

    #[test]
    fn test_quality_score_bounds() {
        assert_eq!(fields(r#"{"score": 7}"#).score, 7);
        assert_eq!(fields(r#"{"score": "10"}"#).score, 10);
        assert_eq!(fields(r#"{"score": 11}"#).score, 0);
        assert_eq!(fields(r#"{"score": -3}"#).score, 0);
        assert_eq!(fields(r#"{"score": 7.5}"#).score, 0);
        assert_eq!(fields(r#"{"score": "great"}"#).score, 0);
        assert_eq!(fields("{}").score, 0);
    }

    #[test]
    fn test_text_accepts_null_and_numbers() {
        #[derive(Deserialize)]
        struct Note {
            #[serde(default, deserialize_with = "text")]
            body: String,
        }
        let note: Note = serde_json::from_str(r#"{"body": null}"#).unwrap();
        assert_eq!(note.body, "");
        let note: Note = serde_json::from_str(r#"{"body": 42}"#).unwrap();
        assert_eq!(note.body, "42");
    }

    #[test]
    fn test_validity_flag_defaults() {
        assert!(fields("{}").valid);
        assert!(fields(r#"{"valid": null}"#).valid);
        assert!(!fields(r#"{"valid": false}"#).valid);
        assert!(!fields(r#"{"valid": 3}"#).valid);
    }
}
