//! Payload Boundary - Typed Input Only
//!
//! Upstream analysis arrives as loosely shaped JSON, sometimes wrapped in
//! prose or markdown fences. Everything is parsed into typed values here,
//! before it reaches the grader or the cost deriver.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::costing::CostingSheet;
use crate::error::EngineError;
use crate::grading::{MalformedInput, MeasurementPoint};
use crate::units::Unit;
use crate::validation::{malformed_input_violations, ValidationResult};

/// One row of the upstream measurement table, numbers still as text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeasurement {
    pub point: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "m", deserialize_with = "text_or_number")]
    pub base: String,
    #[serde(alias = "grading", default, deserialize_with = "text_or_number")]
    pub increment: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub tolerance: String,
    #[serde(default, alias = "isManualGrading")]
    pub manual_grading: bool,
}

impl RawMeasurement {
    fn into_point(self) -> (MeasurementPoint, Vec<MalformedInput>) {
        let (mut point, malformed) = MeasurementPoint::from_text(
            &self.point,
            &self.description,
            &self.base,
            &self.increment,
            &self.tolerance,
        );
        point.manual_grading = self.manual_grading;
        (point, malformed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternPayload {
    pub measurements: Vec<RawMeasurement>,
    #[serde(default)]
    pub units: Option<Unit>,
}

/// Measurement points ready for grading, plus what had to be normalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedPattern {
    pub points: Vec<MeasurementPoint>,
    pub units: Option<Unit>,
    pub report: ValidationResult,
}

impl PatternPayload {
    pub fn ingest(self) -> IngestedPattern {
        let mut points = Vec::with_capacity(self.measurements.len());
        let mut malformed = vec![];
        for raw in self.measurements {
            let (point, issues) = raw.into_point();
            points.push(point);
            malformed.extend(issues);
        }
        IngestedPattern {
            points,
            units: self.units,
            report: ValidationResult::from_violations(malformed_input_violations(&malformed)),
        }
    }
}

/// Accept a JSON string, number or null where text is expected
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Parse text as JSON, falling back to the outermost `{...}` block
pub fn extract_json_object(text: &str) -> Result<Value, EngineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Payload("empty payload".to_string()));
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            tracing::debug!("recovering JSON object embedded in payload text");
            serde_json::from_str(&trimmed[s..=e])
                .map_err(|err| EngineError::Payload(format!("no parseable JSON object: {}", err)))
        }
        _ => Err(EngineError::Payload("no JSON object found".to_string())),
    }
}

fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, EngineError> {
    let value = extract_json_object(text)?;
    serde_json::from_value(value).map_err(|e| EngineError::Payload(e.to_string()))
}

pub fn parse_pattern(text: &str) -> Result<IngestedPattern, EngineError> {
    let payload: PatternPayload = decode(text)?;
    Ok(payload.ingest())
}

pub fn parse_costing(text: &str) -> Result<CostingSheet, EngineError> {
    decode(text)
}

pub fn load_pattern_file(path: &Path) -> Result<IngestedPattern, EngineError> {
    parse_pattern(&fs::read_to_string(path)?)
}

pub fn load_costing_file(path: &Path) -> Result<CostingSheet, EngineError> {
    parse_costing(&fs::read_to_string(path)?)
}
