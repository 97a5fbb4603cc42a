use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FnolError, Result};
use crate::schema::{ClaimBatch, QualityReport, RoutingBatch, SeverityBatch, Validate};

const FENCE: &str = "```";

/// Strips markdown fences and surrounding prose from a model response,
/// leaving the outermost `{...}` span.
///
/// Never fails: text without a brace pair is returned (trimmed) as-is so the
/// decoder can report it.
pub fn sanitize_response(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        // Language tag, e.g. ```json
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        text = rest[tag_len..].trim_start();
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest.trim_end();
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return text[start..=end].to_string();
        }
    }
    text.to_string()
}

/// Sanitizes and decodes a response into `T`.
///
/// Syntax problems surface as [`FnolError::Decode`]; shape, required-field
/// and bounds problems as [`FnolError::Schema`]. Both carry the raw response.
pub fn decode<T>(raw: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let cleaned = sanitize_response(raw);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| FnolError::decode(e, raw))?;
    if !value.is_object() {
        return Err(FnolError::schema("expected a JSON object at the top level", raw));
    }

    let record: T = serde_json::from_value(value).map_err(|e| FnolError::schema(e, raw))?;
    record
        .validate()
        .map_err(|details| FnolError::schema(details, raw))?;

    Ok(record)
}

pub fn decode_claim_batch(raw: &str) -> Result<ClaimBatch> {
    decode(raw)
}

pub fn decode_quality_report(raw: &str) -> Result<QualityReport> {
    decode(raw)
}

pub fn decode_severity_batch(raw: &str) -> Result<SeverityBatch> {
    decode(raw)
}

pub fn decode_routing_batch(raw: &str) -> Result<RoutingBatch> {
    decode(raw)
}
