//! Measurement Grader - Base Size Is Truth
//!
//! Every graded value is recomputed from the original base and increment.
//! Nothing is derived from a previously displayed value, so changing
//! shrinkage or seam allowance never compounds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;
use crate::sizes::Size;
use crate::units::{format_measurement, to_display_unit, Unit};

/// Seam allowance added to every graded value when enabled, in centimeters
pub const SEAM_ALLOWANCE_CM: f64 = 1.2;
/// Upper bound of the shrinkage compensation slider
pub const MAX_SHRINKAGE_PERCENT: f64 = 15.0;

pub const ATHLETIC_MULTIPLIER: f64 = 0.8;
pub const RELAXED_MULTIPLIER: f64 = 1.4;

// --- Numeric parsing ---

/// Parse a decimal with at most one leading sign, e.g. "+2.5", "-1.0", "50".
///
/// `+` keeps the magnitude, `-` (or U+2212) negates it. An exponent such as
/// "2.5e1" is part of the number. Trailing text after the number is ignored
/// so "52.5 cm" reads as 52.5. Anything without a leading number, including
/// doubled signs like "+-2", is rejected.
pub fn parse_signed_decimal(input: &str) -> Option<f64> {
    split_signed_decimal(input).map(|(value, _)| value)
}

/// Parse the leading signed decimal and return it with the unread remainder
fn split_signed_decimal(input: &str) -> Option<(f64, &str)> {
    let s = input.trim();
    let mut chars = s.chars();
    let (negative, rest) = match chars.next()? {
        '+' => (false, chars.as_str()),
        '-' | '\u{2212}' => (true, chars.as_str()),
        _ => (false, s),
    };

    let rest = rest.trim_start();
    let end = numeric_prefix_len(rest);
    if end == 0 {
        return None;
    }

    let magnitude: f64 = rest[..end].parse().ok()?;
    if !magnitude.is_finite() {
        return None;
    }
    let value = if negative { -magnitude } else { magnitude };
    Some((value, &rest[end..]))
}

/// Parse a tolerance such as "±0.5", "+/- 1" or "0.5". Always non-negative.
pub fn parse_tolerance(input: &str) -> Option<f64> {
    split_tolerance(input).map(|(value, _)| value)
}

fn split_tolerance(input: &str) -> Option<(f64, &str)> {
    let s = input.trim();
    let s = s
        .strip_prefix('±')
        .or_else(|| s.strip_prefix("+/-"))
        .unwrap_or(s);
    split_signed_decimal(s).map(|(value, rest)| (value.abs(), rest))
}

/// Byte length of the leading `digits[.digits][e[+-]digits]` run, ending on
/// the last digit. An exponent marker not followed by digits is left unread.
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_dot = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => end = i + 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        i += 1;
    }
    if end == 0 || i >= bytes.len() || !matches!(bytes[i], b'e' | b'E') {
        return end;
    }

    let mut j = i + 1;
    if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
        j += 1;
    }
    let digits_start = j;
    while matches!(bytes.get(j), Some(b'0'..=b'9')) {
        j += 1;
    }
    if j > digits_start {
        j
    } else {
        end
    }
}

/// Text that may follow a number without making it malformed
fn is_unit_suffix(rest: &str) -> bool {
    matches!(
        rest.trim().to_lowercase().as_str(),
        "" | "cm" | "in" | "inch" | "inches" | "\"" | "\u{2033}"
    )
}

// --- Measurement points ---

/// A numeric field that failed to parse and was replaced by zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedInput {
    pub point: String,
    pub field: String,
    pub raw: String,
}

/// One point of measurement, all lengths in centimeters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementPoint {
    pub point: String,
    pub description: String,
    pub base: f64,
    /// Signed grading jump per size step
    pub increment: f64,
    #[serde(default)]
    pub tolerance: f64,
    /// User-edited grading is never re-scaled by the profile
    #[serde(default)]
    pub manual_grading: bool,
}

impl MeasurementPoint {
    pub fn new(
        point: impl Into<String>,
        description: impl Into<String>,
        base: f64,
        increment: f64,
    ) -> Self {
        Self {
            point: point.into(),
            description: description.into(),
            base,
            increment,
            tolerance: 0.0,
            manual_grading: false,
        }
    }

    /// Build from upstream text fields. Unparseable numbers become zero and
    /// are returned alongside the point. A number followed by anything other
    /// than a unit keeps its leading value but is reported too.
    pub fn from_text(
        point: &str,
        description: &str,
        base: &str,
        increment: &str,
        tolerance: &str,
    ) -> (Self, Vec<MalformedInput>) {
        let mut malformed = vec![];
        let mut read = |field: &str, raw: &str, parsed: Option<(f64, &str)>| {
            let value = match parsed {
                Some((value, rest)) if is_unit_suffix(rest) => return value,
                Some((value, rest)) => {
                    tracing::debug!(
                        point,
                        field,
                        raw,
                        rest,
                        "discarded text after measurement value"
                    );
                    value
                }
                None => {
                    tracing::debug!(point, field, raw, "malformed measurement value, using 0");
                    0.0
                }
            };
            malformed.push(MalformedInput {
                point: point.to_string(),
                field: field.to_string(),
                raw: raw.to_string(),
            });
            value
        };

        let base = read("base", base, split_signed_decimal(base));
        let increment = read("increment", increment, split_signed_decimal(increment));
        // An absent tolerance is not malformed
        let tolerance = if tolerance.trim().is_empty() {
            0.0
        } else {
            read("tolerance", tolerance, split_tolerance(tolerance))
        };

        let mp = Self {
            point: point.to_string(),
            description: description.to_string(),
            base,
            increment,
            tolerance,
            manual_grading: false,
        };
        (mp, malformed)
    }

    pub fn manual(mut self) -> Self {
        self.manual_grading = true;
        self
    }
}

// --- Configuration ---

/// Multiplier applied to the grading increment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradingProfile {
    Standard,
    Athletic,
    Relaxed,
    Custom(f64),
}

impl Default for GradingProfile {
    fn default() -> Self {
        Self::Standard
    }
}

impl GradingProfile {
    /// Resolve a profile name plus the optional custom multiplier.
    /// `Custom` without a finite multiplier is rejected, never defaulted.
    pub fn from_parts(name: &str, custom_multiplier: Option<f64>) -> Result<Self, EngineError> {
        match name.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "athletic" => Ok(Self::Athletic),
            "relaxed" => Ok(Self::Relaxed),
            "custom" => match custom_multiplier {
                Some(m) if m.is_finite() => Ok(Self::Custom(m)),
                Some(m) => Err(EngineError::invalid_config(format!(
                    "custom multiplier {} is not finite",
                    m
                ))),
                None => Err(EngineError::invalid_config(
                    "custom profile requires customMultiplier",
                )),
            },
            other => Err(EngineError::invalid_config(format!(
                "unrecognized grading profile '{}'",
                other
            ))),
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            GradingProfile::Standard => 1.0,
            GradingProfile::Athletic => ATHLETIC_MULTIPLIER,
            GradingProfile::Relaxed => RELAXED_MULTIPLIER,
            GradingProfile::Custom(m) => *m,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GradingProfile::Standard => "Standard",
            GradingProfile::Athletic => "Athletic",
            GradingProfile::Relaxed => "Relaxed",
            GradingProfile::Custom(_) => "Custom",
        }
    }

    fn custom_multiplier(&self) -> Option<f64> {
        match self {
            GradingProfile::Custom(m) => Some(*m),
            _ => None,
        }
    }
}

impl fmt::Display for GradingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingProfile::Custom(m) => write!(f, "Custom ({}x)", m),
            other => f.write_str(other.name()),
        }
    }
}

/// Caller-owned grading settings. Validated on construction and on
/// deserialization, so the grader can assume they are in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGradingConfiguration", into = "RawGradingConfiguration")]
pub struct GradingConfiguration {
    profile: GradingProfile,
    shrinkage_percent: f64,
    seam_allowance: bool,
    unit: Unit,
}

impl GradingConfiguration {
    pub fn new(
        profile: GradingProfile,
        shrinkage_percent: f64,
        seam_allowance: bool,
        unit: Unit,
    ) -> Result<Self, EngineError> {
        if !(0.0..=MAX_SHRINKAGE_PERCENT).contains(&shrinkage_percent) {
            return Err(EngineError::invalid_config(format!(
                "shrinkage {}% outside [0, {}]",
                shrinkage_percent, MAX_SHRINKAGE_PERCENT
            )));
        }
        if let GradingProfile::Custom(m) = profile {
            if !m.is_finite() {
                return Err(EngineError::invalid_config(format!(
                    "custom multiplier {} is not finite",
                    m
                )));
            }
        }
        Ok(Self { profile, shrinkage_percent, seam_allowance, unit })
    }

    pub fn profile(&self) -> GradingProfile {
        self.profile
    }

    pub fn shrinkage_percent(&self) -> f64 {
        self.shrinkage_percent
    }

    pub fn seam_allowance(&self) -> bool {
        self.seam_allowance
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_seam_allowance(mut self, enabled: bool) -> Self {
        self.seam_allowance = enabled;
        self
    }
}

impl Default for GradingConfiguration {
    fn default() -> Self {
        Self {
            profile: GradingProfile::Standard,
            shrinkage_percent: 0.0,
            seam_allowance: false,
            unit: Unit::Cm,
        }
    }
}

/// Wire shape of [`GradingConfiguration`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGradingConfiguration {
    profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_multiplier: Option<f64>,
    #[serde(default)]
    shrinkage_percent: f64,
    #[serde(default)]
    seam_allowance: bool,
    #[serde(default)]
    unit: Unit,
}

impl TryFrom<RawGradingConfiguration> for GradingConfiguration {
    type Error = EngineError;

    fn try_from(raw: RawGradingConfiguration) -> Result<Self, Self::Error> {
        let profile = GradingProfile::from_parts(&raw.profile, raw.custom_multiplier)?;
        Self::new(profile, raw.shrinkage_percent, raw.seam_allowance, raw.unit)
    }
}

impl From<GradingConfiguration> for RawGradingConfiguration {
    fn from(config: GradingConfiguration) -> Self {
        Self {
            profile: config.profile.name().to_string(),
            custom_multiplier: config.profile.custom_multiplier(),
            shrinkage_percent: config.shrinkage_percent,
            seam_allowance: config.seam_allowance,
            unit: config.unit,
        }
    }
}

/// Business constants the grader applies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingPolicy {
    pub seam_allowance_cm: f64,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self { seam_allowance_cm: SEAM_ALLOWANCE_CM }
    }
}

// --- Grader ---

#[derive(Debug, Clone, Default)]
pub struct MeasurementGrader {
    policy: GradingPolicy,
}

impl MeasurementGrader {
    pub fn new(policy: GradingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    /// Graded value in centimeters, before unit conversion
    pub fn grade_cm(
        &self,
        point: &MeasurementPoint,
        size: Size,
        config: &GradingConfiguration,
    ) -> f64 {
        let multiplier = if point.manual_grading { 1.0 } else { config.profile.multiplier() };
        self.finish(point.base, point.increment, multiplier, size, config)
    }

    /// Graded value in the configured display unit
    pub fn grade_value(
        &self,
        point: &MeasurementPoint,
        size: Size,
        config: &GradingConfiguration,
    ) -> f64 {
        to_display_unit(self.grade_cm(point, size, config), config.unit)
    }

    /// Graded value formatted with the unit suffix, e.g. "54.1cm"
    pub fn grade(
        &self,
        point: &MeasurementPoint,
        size: Size,
        config: &GradingConfiguration,
    ) -> String {
        format_measurement(self.grade_value(point, size, config), config.unit)
    }

    /// Grade a user-edited base/increment pair. The profile multiplier is not applied.
    pub fn grade_manual_value(
        &self,
        base: f64,
        increment: f64,
        size: Size,
        config: &GradingConfiguration,
    ) -> f64 {
        to_display_unit(self.finish(base, increment, 1.0, size, config), config.unit)
    }

    fn finish(
        &self,
        base: f64,
        increment: f64,
        multiplier: f64,
        size: Size,
        config: &GradingConfiguration,
    ) -> f64 {
        let mut value = base + increment * multiplier * size.step_offset() as f64;
        value *= 1.0 + config.shrinkage_percent / 100.0;
        if config.seam_allowance {
            value += self.policy.seam_allowance_cm;
        }
        value
    }
}

/// Grade with the default policy
pub fn grade(point: &MeasurementPoint, size: Size, config: &GradingConfiguration) -> String {
    MeasurementGrader::default().grade(point, size, config)
}

/// Numeric variant of [`grade`]
pub fn grade_value(point: &MeasurementPoint, size: Size, config: &GradingConfiguration) -> f64 {
    MeasurementGrader::default().grade_value(point, size, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        profile: GradingProfile,
        shrinkage: f64,
        seam: bool,
        unit: Unit,
    ) -> GradingConfiguration {
        GradingConfiguration::new(profile, shrinkage, seam, unit).unwrap()
    }

    #[test]
    fn test_parse_signed_decimal() {
        assert_eq!(parse_signed_decimal("+2.5"), Some(2.5));
        assert_eq!(parse_signed_decimal("-1.0"), Some(-1.0));
        assert_eq!(parse_signed_decimal("  50 "), Some(50.0));
        assert_eq!(parse_signed_decimal("\u{2212}0.5"), Some(-0.5));
        assert_eq!(parse_signed_decimal("52.5 cm"), Some(52.5));
        assert_eq!(parse_signed_decimal(".5"), Some(0.5));
        assert_eq!(parse_signed_decimal("- 3"), Some(-3.0));
    }

    #[test]
    fn test_parse_signed_decimal_rejects() {
        assert_eq!(parse_signed_decimal(""), None);
        assert_eq!(parse_signed_decimal("n/a"), None);
        assert_eq!(parse_signed_decimal("+-2"), None);
        assert_eq!(parse_signed_decimal("--2"), None);
        assert_eq!(parse_signed_decimal("+"), None);
        assert_eq!(parse_signed_decimal("."), None);
    }

    #[test]
    fn test_sign_symmetry() {
        for raw in ["0.5", "1", "2.25", "10.0"] {
            let plus = parse_signed_decimal(&format!("+{}", raw)).unwrap();
            let minus = parse_signed_decimal(&format!("-{}", raw)).unwrap();
            assert_eq!(plus, -minus);
            assert_eq!(plus, parse_signed_decimal(raw).unwrap());
        }
    }

    #[test]
    fn test_parse_tolerance() {
        assert_eq!(parse_tolerance("±0.5"), Some(0.5));
        assert_eq!(parse_tolerance("+/- 1"), Some(1.0));
        assert_eq!(parse_tolerance("-0.75"), Some(0.75));
        assert_eq!(parse_tolerance("tight"), None);
    }

    #[test]
    fn test_parse_signed_decimal_exponent() {
        assert_eq!(parse_signed_decimal("2.5e1"), Some(25.0));
        assert_eq!(parse_signed_decimal("1E-1"), Some(0.1));
        assert_eq!(parse_signed_decimal("-4e+0"), Some(-4.0));
        // A bare marker is not an exponent
        assert_eq!(parse_signed_decimal("3e"), Some(3.0));
        assert_eq!(parse_signed_decimal("3em"), Some(3.0));
    }

    #[test]
    fn test_from_text_reports_discarded_text() {
        let (mp, malformed) = MeasurementPoint::from_text("Hip", "", "1,5", "+2.5e1", "±1 cm");
        assert_eq!(mp.base, 1.0);
        assert_eq!(mp.increment, 25.0);
        assert_eq!(mp.tolerance, 1.0);
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].field, "base");
        assert_eq!(malformed[0].raw, "1,5");
    }

    #[test]
    fn test_from_text_accepts_unit_suffix() {
        for raw in ["52.5 cm", "20.5in", "20.5 inches", "20.5\"", "20.5\u{2033}"] {
            let (_, malformed) = MeasurementPoint::from_text("Waist", "", raw, "+1", "");
            assert!(malformed.is_empty(), "{}", raw);
        }
        let (mp, malformed) = MeasurementPoint::from_text("Waist", "", "52.5 approx", "+1", "");
        assert_eq!(mp.base, 52.5);
        assert_eq!(malformed.len(), 1);
    }

    #[test]
    fn test_from_text_substitutes_zero() {
        let (mp, malformed) =
            MeasurementPoint::from_text("Chest", "1cm below armhole", "abc", "+2.0", "");
        assert_eq!(mp.base, 0.0);
        assert_eq!(mp.increment, 2.0);
        assert_eq!(mp.tolerance, 0.0);
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].field, "base");
        assert_eq!(malformed[0].raw, "abc");
    }

    #[test]
    fn test_reference_example() {
        let (mp, _) = MeasurementPoint::from_text("Body Length", "HPS to hem", "50", "+2.0", "±1");
        let cfg = config(GradingProfile::Standard, 4.0, false, Unit::Cm);
        assert!((grade_value(&mp, Size::L, &cfg) - 54.08).abs() < 1e-9);
        assert_eq!(grade(&mp, Size::L, &cfg), "54.1cm");
    }

    #[test]
    fn test_profiles_scale_increment() {
        let mp = MeasurementPoint::new("Chest", "", 50.0, 2.0);
        let grader = MeasurementGrader::default();
        let athletic = config(GradingProfile::Athletic, 0.0, false, Unit::Cm);
        let relaxed = config(GradingProfile::Relaxed, 0.0, false, Unit::Cm);
        let custom = config(GradingProfile::Custom(2.0), 0.0, false, Unit::Cm);
        assert!((grader.grade_cm(&mp, Size::Xl, &athletic) - 53.2).abs() < 1e-9);
        assert!((grader.grade_cm(&mp, Size::Xs, &relaxed) - 44.4).abs() < 1e-9);
        assert!((grader.grade_cm(&mp, Size::Xxl, &custom) - 62.0).abs() < 1e-9);
    }

    #[test]
    fn test_manual_grading_ignores_profile() {
        let cfg = config(GradingProfile::Relaxed, 0.0, false, Unit::Cm);
        let mp = MeasurementPoint::new("Hem", "", 40.0, 1.0).manual();
        let grader = MeasurementGrader::default();
        assert_eq!(grader.grade_cm(&mp, Size::Xl, &cfg), 42.0);
        assert_eq!(grader.grade_manual_value(40.0, 1.0, Size::Xl, &cfg), 42.0);
    }

    #[test]
    fn test_seam_allowance_before_conversion() {
        let mp = MeasurementPoint::new("Sleeve", "", 60.0, 1.5);
        let cfg = config(GradingProfile::Standard, 0.0, true, Unit::In);
        let expected = (60.0 + 1.2) / 2.54;
        assert!((grade_value(&mp, Size::M, &cfg) - expected).abs() < 1e-9);
        assert_eq!(grade(&mp, Size::M, &cfg), "24.09in");
    }

    #[test]
    fn test_custom_seam_policy() {
        let grader = MeasurementGrader::new(GradingPolicy { seam_allowance_cm: 1.0 });
        let mp = MeasurementPoint::new("Waist", "", 30.0, 0.0);
        let cfg = config(GradingProfile::Standard, 0.0, true, Unit::Cm);
        assert_eq!(grader.grade_cm(&mp, Size::M, &cfg), 31.0);
    }

    #[test]
    fn test_no_compounding_on_config_change() {
        let mp = MeasurementPoint::new("Chest", "", 50.0, 2.0);
        let first = config(GradingProfile::Standard, 10.0, true, Unit::Cm);
        let _ = grade_value(&mp, Size::L, &first);
        let second = config(GradingProfile::Standard, 0.0, false, Unit::Cm);
        assert_eq!(grade_value(&mp, Size::L, &second), 52.0);
    }

    #[test]
    fn test_configuration_rejects_out_of_range() {
        assert!(GradingConfiguration::new(GradingProfile::Standard, 16.0, false, Unit::Cm)
            .unwrap_err()
            .is_invalid_configuration());
        let negative = GradingConfiguration::new(GradingProfile::Standard, -1.0, false, Unit::Cm);
        assert!(negative.is_err());
        let nan = GradingProfile::Custom(f64::NAN);
        assert!(GradingConfiguration::new(nan, 0.0, false, Unit::Cm).is_err());
    }

    #[test]
    fn test_profile_from_parts() {
        assert_eq!(GradingProfile::from_parts("Athletic", None).unwrap(), GradingProfile::Athletic);
        assert_eq!(
            GradingProfile::from_parts("custom", Some(1.1)).unwrap(),
            GradingProfile::Custom(1.1)
        );
        assert!(GradingProfile::from_parts("Custom", None).unwrap_err().is_invalid_configuration());
        assert!(GradingProfile::from_parts("Slim", None).unwrap_err().is_invalid_configuration());
    }

    #[test]
    fn test_configuration_wire_format() {
        let cfg: GradingConfiguration = serde_json::from_value(serde_json::json!({
            "profile": "Custom",
            "customMultiplier": 1.2,
            "shrinkagePercent": 4,
            "seamAllowance": true,
            "unit": "in",
        }))
        .unwrap();
        assert_eq!(cfg.profile(), GradingProfile::Custom(1.2));
        assert_eq!(cfg.unit(), Unit::In);

        let bad = r#"{"profile":"Standard","shrinkagePercent":40}"#;
        assert!(serde_json::from_str::<GradingConfiguration>(bad).is_err());

        let json = serde_json::to_value(cfg).unwrap();
        assert_eq!(json["profile"], "Custom");
        assert_eq!(json["customMultiplier"], 1.2);
    }
}
