//! Validation System - Rules Report, They Never Correct
//!
//! Rules produce structured violations over upstream data.
//! Warnings are surfaced to the caller; only errors block a computation.

use serde::{Deserialize, Serialize};

use crate::costing::{CostingSheet, BREAKDOWN_TOLERANCE};
use crate::grading::MalformedInput;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Self {
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        Self { valid, violations }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }

    /// "rule: message" for every error, joined for an error report
    pub fn error_summary(&self) -> String {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, sheet: &CostingSheet) -> Vec<ValidationViolation>;
}

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

// --- Concrete Rules ---

/// Breakdown must sum to the estimated unit cost
pub struct BreakdownSumRule;

impl ValidationRule for BreakdownSumRule {
    fn name(&self) -> &'static str { "breakdown_sum" }

    fn validate(&self, sheet: &CostingSheet) -> Vec<ValidationViolation> {
        if sheet.breakdown.matches(sheet.estimated_cost_per_unit) {
            return vec![];
        }
        let actual = sheet.breakdown.total();
        tracing::warn!(
            expected = sheet.estimated_cost_per_unit,
            actual,
            "cost breakdown does not sum to estimated cost per unit"
        );
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Cost breakdown does not sum to estimated cost per unit".to_string(),
            expected: Some(money(sheet.estimated_cost_per_unit)),
            actual: Some(money(actual)),
            remediation: vec![
                "Re-run the cost analysis or review material, labor and overhead".to_string(),
            ],
        }]
    }
}

/// Each BOM line total should equal quantity x unit price
pub struct BomLineTotalRule;

impl ValidationRule for BomLineTotalRule {
    fn name(&self) -> &'static str { "bom_line_total" }

    fn validate(&self, sheet: &CostingSheet) -> Vec<ValidationViolation> {
        sheet
            .bom
            .iter()
            .filter(|line| (line.computed_total() - line.total).abs() > BREAKDOWN_TOLERANCE)
            .map(|line| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!(
                    "BOM line '{}' total does not match quantity x unit price",
                    line.item
                ),
                expected: Some(money(line.computed_total())),
                actual: Some(money(line.total)),
                remediation: vec!["Check quantity and unit price for this material".to_string()],
            })
            .collect()
    }
}

/// Each labor op total should equal SMV x rate per minute
pub struct LaborOpTotalRule;

impl ValidationRule for LaborOpTotalRule {
    fn name(&self) -> &'static str { "labor_op_total" }

    fn validate(&self, sheet: &CostingSheet) -> Vec<ValidationViolation> {
        sheet
            .labor_ops
            .iter()
            .filter(|op| (op.computed_total() - op.total).abs() > BREAKDOWN_TOLERANCE)
            .map(|op| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!(
                    "Labor operation '{}' total does not match SMV x rate",
                    op.operation
                ),
                expected: Some(money(op.computed_total())),
                actual: Some(money(op.total)),
                remediation: vec!["Check SMV and rate per minute for this operation".to_string()],
            })
            .collect()
    }
}

/// Money amounts can never be negative
pub struct NegativeAmountRule;

impl ValidationRule for NegativeAmountRule {
    fn name(&self) -> &'static str { "negative_amount" }

    fn validate(&self, sheet: &CostingSheet) -> Vec<ValidationViolation> {
        let b = &sheet.breakdown;
        let amounts = [
            ("estimatedCostPerUnit", sheet.estimated_cost_per_unit),
            ("breakdown.material", b.material),
            ("breakdown.labor", b.labor),
            ("breakdown.overhead", b.overhead),
        ];
        let lines = sheet.bom.iter().map(|l| (l.item.as_str(), l.total));
        let ops = sheet.labor_ops.iter().map(|op| (op.operation.as_str(), op.total));

        amounts
            .into_iter()
            .chain(lines)
            .chain(ops)
            .filter(|(_, v)| *v < 0.0 || !v.is_finite())
            .map(|(field, v)| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: format!("'{}' is not a valid amount", field),
                expected: Some(">= 0.00".to_string()),
                actual: Some(v.to_string()),
                remediation: vec!["Provide a non-negative cost".to_string()],
            })
            .collect()
    }
}

/// Report substituted measurement values
pub fn malformed_input_violations(malformed: &[MalformedInput]) -> Vec<ValidationViolation> {
    malformed
        .iter()
        .map(|m| ValidationViolation {
            rule: "malformed_input".to_string(),
            severity: ViolationSeverity::Info,
            message: format!("'{}' {} is not a number, graded as 0", m.point, m.field),
            expected: Some("signed decimal".to_string()),
            actual: Some(m.raw.clone()),
            remediation: vec!["Correct the value in the measurement table".to_string()],
        })
        .collect()
}

/// Validator orchestrates rules
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(NegativeAmountRule),
                Box::new(BreakdownSumRule),
                Box::new(BomLineTotalRule),
                Box::new(LaborOpTotalRule),
            ],
        }
    }

    pub fn validate(&self, sheet: &CostingSheet) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            all_violations.extend(rule.validate(sheet));
        }

        ValidationResult::from_violations(all_violations)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::{BomLine, CostBreakdown};

    fn sheet(cost: f64, breakdown: CostBreakdown) -> CostingSheet {
        CostingSheet {
            region: "pakistan".to_string(),
            currency: "USD".to_string(),
            bom: vec![],
            labor_ops: vec![],
            fabric_gsm: 180.0,
            marker_width: 150.0,
            estimated_cost_per_unit: cost,
            total_labor_hours: 0.2,
            breakdown,
        }
    }

    #[test]
    fn test_consistent_sheet_is_clean() {
        let s = sheet(10.0, CostBreakdown { material: 6.0, labor: 3.0, overhead: 1.0 });
        let result = Validator::new().validate(&s);
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_breakdown_mismatch_is_warning() {
        let s = sheet(10.0, CostBreakdown { material: 6.0, labor: 3.0, overhead: 2.0 });
        let result = Validator::new().validate(&s);
        assert!(result.valid);
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.violations[0].rule, "breakdown_sum");
        assert_eq!(result.violations[0].actual.as_deref(), Some("11.00"));
    }

    #[test]
    fn test_bom_line_mismatch() {
        let mut s = sheet(1.0, CostBreakdown { material: 1.0, labor: 0.0, overhead: 0.0 });
        s.bom.push(BomLine {
            item: "Zipper".to_string(),
            specification: "YKK #5".to_string(),
            quantity: 2.0,
            unit: "pcs".to_string(),
            unit_price: 0.4,
            total: 1.0,
        });
        let result = Validator::new().validate(&s);
        assert!(result.valid);
        assert!(result.violations.iter().any(|v| v.rule == "bom_line_total"));
    }

    #[test]
    fn test_negative_amount_blocks() {
        let s = sheet(-2.0, CostBreakdown { material: -2.0, labor: 0.0, overhead: 0.0 });
        let result = Validator::new().validate(&s);
        assert!(!result.valid);
        assert!(result.has_errors());
        assert!(result.error_summary().contains("negative_amount"));
    }

    #[test]
    fn test_malformed_inputs_are_info() {
        let v = malformed_input_violations(&[MalformedInput {
            point: "Chest".to_string(),
            field: "increment".to_string(),
            raw: "TBD".to_string(),
        }]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].severity, ViolationSeverity::Info);
        assert!(ValidationResult::from_violations(v).valid);
    }
}
