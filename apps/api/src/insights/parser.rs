//! Insight Parser — normalizes free-text model output into a typed
//! `InsightPayload`.
//!
//! The model is instructed to emit bare JSON, but real output may arrive
//! wrapped in markdown code fences or preceded by commentary. The parser
//! strips that wrapping, decodes the object, and validates every required
//! field with a lenient coercion policy: numeric-looking strings become
//! numbers, scalar values become strings. Missing or mistyped fields are
//! hard failures — silent defaults would corrupt the cached record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::insights::InsightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandLevel {
    High,
    Medium,
    Low,
}

impl DemandLevel {
    /// Case-sensitive, exactly as the model is prompted to produce.
    fn parse(s: &str) -> Option<Self> {
        match s {
            "High" => Some(DemandLevel::High),
            "Medium" => Some(DemandLevel::Medium),
            "Low" => Some(DemandLevel::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DemandLevel::High => "High",
            DemandLevel::Medium => "Medium",
            DemandLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketOutlook {
    Positive,
    Neutral,
    Negative,
}

impl MarketOutlook {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(MarketOutlook::Positive),
            "Neutral" => Some(MarketOutlook::Neutral),
            "Negative" => Some(MarketOutlook::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketOutlook::Positive => "Positive",
            MarketOutlook::Neutral => "Neutral",
            MarketOutlook::Negative => "Negative",
        }
    }
}

/// One salary band for a role within the industry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryBand {
    pub role: String,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub location: String,
}

impl SalaryBand {
    /// Expected ordering of a well-formed band. The parser does not enforce
    /// this; tests flag violations instead of silently accepting them.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.median && self.median <= self.max
    }
}

/// Validated model output for one industry, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightPayload {
    pub salary_ranges: Vec<SalaryBand>,
    pub growth_rate: f64,
    pub demand_level: DemandLevel,
    pub top_skills: Vec<String>,
    pub market_outlook: MarketOutlook,
    pub key_trends: Vec<String>,
    pub recommended_skills: Vec<String>,
}

/// Parses raw model output into an `InsightPayload`. All failures carry the
/// offending raw text for diagnostics.
pub fn parse_insight(raw: &str) -> Result<InsightPayload, InsightError> {
    let malformed = |reason: String| InsightError::MalformedOutput {
        reason,
        raw: raw.to_string(),
    };

    let text = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        // Commentary around the object: retry on the outermost brace span.
        Err(_) => extract_object_span(text)
            .and_then(|span| serde_json::from_str(span).ok())
            .ok_or_else(|| malformed("no JSON object found in model output".to_string()))?,
    };

    decode_payload(&value).map_err(malformed)
}

fn decode_payload(value: &Value) -> Result<InsightPayload, String> {
    let obj = value
        .as_object()
        .ok_or("model output is not a JSON object")?;

    let bands_value = require(obj, "salaryRanges")?
        .as_array()
        .ok_or("'salaryRanges' is not an array")?;
    let mut salary_ranges = Vec::with_capacity(bands_value.len());
    for (i, band) in bands_value.iter().enumerate() {
        salary_ranges
            .push(parse_salary_band(band).map_err(|reason| format!("salaryRanges[{i}]: {reason}"))?);
    }

    let growth_rate =
        coerce_f64(require(obj, "growthRate")?).ok_or("'growthRate' is not a number")?;
    if !growth_rate.is_finite() {
        return Err("'growthRate' is not a finite number".to_string());
    }

    let demand_level = require(obj, "demandLevel")?
        .as_str()
        .and_then(DemandLevel::parse)
        .ok_or("'demandLevel' must be High, Medium, or Low")?;

    let market_outlook = require(obj, "marketOutlook")?
        .as_str()
        .and_then(MarketOutlook::parse)
        .ok_or("'marketOutlook' must be Positive, Neutral, or Negative")?;

    let top_skills = coerce_string_seq(require(obj, "topSkills")?)
        .ok_or("'topSkills' is not an array of strings")?;
    let key_trends = coerce_string_seq(require(obj, "keyTrends")?)
        .ok_or("'keyTrends' is not an array of strings")?;
    let recommended_skills = coerce_string_seq(require(obj, "recommendedSkills")?)
        .ok_or("'recommendedSkills' is not an array of strings")?;

    Ok(InsightPayload {
        salary_ranges,
        growth_rate,
        demand_level,
        top_skills,
        market_outlook,
        key_trends,
        recommended_skills,
    })
}

fn require<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a Value, String> {
    obj.get(key).ok_or_else(|| format!("missing field '{key}'"))
}

fn parse_salary_band(value: &Value) -> Result<SalaryBand, String> {
    let obj = value.as_object().ok_or("not an object")?;

    Ok(SalaryBand {
        role: coerce_string(require(obj, "role")?).ok_or("'role' is not a string")?,
        min: coerce_f64(require(obj, "min")?).ok_or("'min' is not a number")?,
        max: coerce_f64(require(obj, "max")?).ok_or("'max' is not a number")?,
        median: coerce_f64(require(obj, "median")?).ok_or("'median' is not a number")?,
        location: coerce_string(require(obj, "location")?).ok_or("'location' is not a string")?,
    })
}

/// Numbers, plus numeric-looking strings like `"95000"` or `"3.5"`.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Strings, plus scalars stringified (a numeric skill entry is unusual but
/// not worth rejecting the whole payload over).
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_string_seq(value: &Value) -> Option<Vec<String>> {
    value.as_array()?.iter().map(coerce_string).collect()
}

/// Strips ```json ... ``` or ``` ... ``` code fences wrapped around the
/// output, then trims whitespace.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let stripped = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match stripped {
        Some(inner) => {
            let inner = inner.trim_start();
            inner.strip_suffix("```").map(|s| s.trim()).unwrap_or(inner)
        }
        None => text,
    }
}

/// The outermost `{ ... }` span, for output with commentary around the object.
fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
