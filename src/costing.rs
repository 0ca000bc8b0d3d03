//! Cost Deriver - Upstream Cost Is Authoritative
//!
//! Prices are derived from the unit cost; the cost breakdown is read through,
//! never reconciled.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Suggested retail as a multiple of wholesale
pub const RETAIL_MULTIPLIER: f64 = 2.5;
pub const MIN_MARKUP_PERCENT: f64 = 10.0;
pub const MAX_MARKUP_PERCENT: f64 = 80.0;
/// Allowed gap between a stated total and the sum of its parts
pub const BREAKDOWN_TOLERANCE: f64 = 0.01;

/// Material / labor / overhead split of the unit cost
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(default)]
    pub material: f64,
    #[serde(default)]
    pub labor: f64,
    #[serde(default)]
    pub overhead: f64,
}

impl CostBreakdown {
    /// Read-through sum; the breakdown is never corrected to match anything
    pub fn total(&self) -> f64 {
        self.material + self.labor + self.overhead
    }

    /// Whether the parts sum to `expected` within [`BREAKDOWN_TOLERANCE`]
    pub fn matches(&self, expected: f64) -> bool {
        (self.total() - expected).abs() <= BREAKDOWN_TOLERANCE
    }

    /// Percentage of `unit_cost` each bucket represents. All zero when the cost is zero.
    pub fn shares(&self, unit_cost: f64) -> BreakdownShares {
        let pct = |part: f64| if unit_cost == 0.0 { 0.0 } else { part / unit_cost * 100.0 };
        BreakdownShares {
            material: pct(self.material),
            labor: pct(self.labor),
            overhead: pct(self.overhead),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakdownShares {
    pub material: f64,
    pub labor: f64,
    pub overhead: f64,
}

/// Sum a breakdown. See [`CostBreakdown::total`].
pub fn breakdown_total(breakdown: &CostBreakdown) -> f64 {
    let total = breakdown.total();
    tracing::trace!(total, "breakdown total");
    total
}

// --- Bill of materials and labor ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    pub item: String,
    #[serde(default)]
    pub specification: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub unit_price: f64,
    /// Total as stated upstream
    #[serde(default)]
    pub total: f64,
}

impl BomLine {
    pub fn computed_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborOp {
    pub operation: String,
    #[serde(default)]
    pub department: String,
    /// Standard minute value
    #[serde(default)]
    pub smv: f64,
    #[serde(default)]
    pub rate_per_minute: f64,
    #[serde(default)]
    pub total: f64,
}

impl LaborOp {
    pub fn computed_total(&self) -> f64 {
        self.smv * self.rate_per_minute
    }
}

/// Typed costing result from the upstream technical analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostingSheet {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub bom: Vec<BomLine>,
    #[serde(default)]
    pub labor_ops: Vec<LaborOp>,
    #[serde(default)]
    pub fabric_gsm: f64,
    #[serde(default)]
    pub marker_width: f64,
    pub estimated_cost_per_unit: f64,
    #[serde(default)]
    pub total_labor_hours: f64,
    #[serde(default)]
    pub breakdown: CostBreakdown,
}

impl CostingSheet {
    pub fn bom_total(&self) -> f64 {
        self.bom.iter().map(|l| l.total).sum()
    }

    pub fn labor_total(&self) -> f64 {
        self.labor_ops.iter().map(|op| op.total).sum()
    }

    pub fn total_smv(&self) -> f64 {
        self.labor_ops.iter().map(|op| op.smv).sum()
    }

    pub fn breakdown_shares(&self) -> BreakdownShares {
        self.breakdown.shares(self.estimated_cost_per_unit)
    }
}

// --- Pricing ---

/// Business constants for price derivation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    pub retail_multiplier: f64,
    pub min_markup_percent: f64,
    pub max_markup_percent: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            retail_multiplier: RETAIL_MULTIPLIER,
            min_markup_percent: MIN_MARKUP_PERCENT,
            max_markup_percent: MAX_MARKUP_PERCENT,
        }
    }
}

impl PricingPolicy {
    /// A policy whose markup range would allow a zero or negative
    /// denominator is rejected
    pub fn new(
        retail_multiplier: f64,
        min_markup_percent: f64,
        max_markup_percent: f64,
    ) -> Result<Self, EngineError> {
        if !retail_multiplier.is_finite() || retail_multiplier <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "retail multiplier {} must be positive",
                retail_multiplier
            )));
        }
        if !(0.0..100.0).contains(&min_markup_percent)
            || !(0.0..100.0).contains(&max_markup_percent)
            || min_markup_percent > max_markup_percent
        {
            return Err(EngineError::invalid_config(format!(
                "markup range [{}, {}] must lie within [0, 100)",
                min_markup_percent, max_markup_percent
            )));
        }
        Ok(Self { retail_multiplier, min_markup_percent, max_markup_percent })
    }

    pub fn check_markup(&self, markup_percentage: f64) -> Result<(), EngineError> {
        if (self.min_markup_percent..=self.max_markup_percent).contains(&markup_percentage) {
            Ok(())
        } else {
            Err(EngineError::invalid_config(format!(
                "markup {}% outside [{}, {}]",
                markup_percentage, self.min_markup_percent, self.max_markup_percent
            )))
        }
    }
}

/// Caller-owned pricing settings. Checked against a [`PricingPolicy`] on
/// construction; deserialization checks against the default policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPricingConfiguration", into = "RawPricingConfiguration")]
pub struct PricingConfiguration {
    markup_percentage: f64,
}

impl PricingConfiguration {
    pub fn new(markup_percentage: f64) -> Result<Self, EngineError> {
        Self::with_policy(markup_percentage, &PricingPolicy::default())
    }

    pub fn with_policy(
        markup_percentage: f64,
        policy: &PricingPolicy,
    ) -> Result<Self, EngineError> {
        policy.check_markup(markup_percentage)?;
        Ok(Self { markup_percentage })
    }

    pub fn markup_percentage(&self) -> f64 {
        self.markup_percentage
    }
}

/// Wire shape of [`PricingConfiguration`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPricingConfiguration {
    markup_percentage: f64,
}

impl TryFrom<RawPricingConfiguration> for PricingConfiguration {
    type Error = EngineError;

    fn try_from(raw: RawPricingConfiguration) -> Result<Self, Self::Error> {
        Self::new(raw.markup_percentage)
    }
}

impl From<PricingConfiguration> for RawPricingConfiguration {
    fn from(config: PricingConfiguration) -> Self {
        Self { markup_percentage: config.markup_percentage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoints {
    pub wholesale: f64,
    pub retail: f64,
}

impl PricePoints {
    pub fn display(&self) -> (String, String) {
        (format_money(self.wholesale), format_money(self.retail))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CostDeriver {
    policy: PricingPolicy,
}

impl CostDeriver {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// wholesale = cost / (1 - markup/100), retail = wholesale * retail multiplier
    pub fn derive_prices(
        &self,
        unit_cost: f64,
        markup_percentage: f64,
    ) -> Result<PricePoints, EngineError> {
        if !unit_cost.is_finite() || unit_cost < 0.0 {
            return Err(EngineError::invalid_config(format!(
                "unit cost {} must be a non-negative number",
                unit_cost
            )));
        }
        self.policy.check_markup(markup_percentage)?;

        let wholesale = unit_cost / (1.0 - markup_percentage / 100.0);
        let retail = wholesale * self.policy.retail_multiplier;
        tracing::debug!(unit_cost, markup_percentage, wholesale, retail, "derived prices");
        Ok(PricePoints { wholesale, retail })
    }
}

/// Derive prices under the default policy
pub fn derive_prices(unit_cost: f64, markup_percentage: f64) -> Result<PricePoints, EngineError> {
    CostDeriver::default().derive_prices(unit_cost, markup_percentage)
}

pub fn format_money(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_example() {
        let prices = derive_prices(10.0, 45.0).unwrap();
        assert!((prices.wholesale - 18.1818).abs() < 1e-4);
        assert!((prices.retail - 45.4545).abs() < 1e-4);
        assert_eq!(prices.display(), ("18.18".to_string(), "45.45".to_string()));
    }

    #[test]
    fn test_markup_bounds_inclusive() {
        assert!(derive_prices(10.0, 10.0).is_ok());
        assert!(derive_prices(10.0, 80.0).is_ok());
        assert!(derive_prices(10.0, 9.99).unwrap_err().is_invalid_configuration());
        assert!(derive_prices(10.0, 80.01).unwrap_err().is_invalid_configuration());
        assert!(derive_prices(10.0, 100.0).unwrap_err().is_invalid_configuration());
        assert!(derive_prices(10.0, f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_bad_unit_cost() {
        assert!(derive_prices(-1.0, 45.0).unwrap_err().is_invalid_configuration());
        assert!(derive_prices(f64::INFINITY, 45.0).is_err());
    }

    #[test]
    fn test_zero_markup_policy() {
        let deriver = CostDeriver::new(PricingPolicy::new(RETAIL_MULTIPLIER, 0.0, 80.0).unwrap());
        let prices = deriver.derive_prices(12.5, 0.0).unwrap();
        assert_eq!(prices.wholesale, 12.5);
        assert_eq!(prices.retail, 2.5 * 12.5);
    }

    #[test]
    fn test_policy_rejects_full_markup() {
        assert!(PricingPolicy::new(2.5, 10.0, 100.0).is_err());
        assert!(PricingPolicy::new(2.5, 50.0, 40.0).is_err());
        assert!(PricingPolicy::new(0.0, 10.0, 80.0).is_err());
    }

    #[test]
    fn test_pricing_configuration_validates() {
        assert!(PricingConfiguration::new(45.0).is_ok());
        assert!(PricingConfiguration::new(5.0).is_err());
    }

    #[test]
    fn test_pricing_configuration_deserialize_validates() {
        let ok: PricingConfiguration = serde_json::from_str(r#"{"markupPercentage": 45}"#).unwrap();
        assert_eq!(ok.markup_percentage(), 45.0);
        let full = serde_json::from_str::<PricingConfiguration>(r#"{"markupPercentage": 100}"#);
        assert!(full.is_err());
        let low = serde_json::from_str::<PricingConfiguration>(r#"{"markupPercentage": 5}"#);
        assert!(low.is_err());

        let json = serde_json::to_value(ok).unwrap();
        assert_eq!(json["markupPercentage"], 45.0);
    }

    #[test]
    fn test_pricing_configuration_with_policy() {
        let open = PricingPolicy::new(RETAIL_MULTIPLIER, 0.0, 80.0).unwrap();
        let config = PricingConfiguration::with_policy(0.0, &open).unwrap();
        assert_eq!(config.markup_percentage(), 0.0);
        assert!(PricingConfiguration::new(0.0).unwrap_err().is_invalid_configuration());
        assert!(PricingConfiguration::with_policy(85.0, &open).is_err());
    }

    #[test]
    fn test_breakdown_read_through() {
        let b = CostBreakdown { material: 4.5, labor: 3.25, overhead: 1.0 };
        assert_eq!(breakdown_total(&b), 8.75);
        assert!(b.matches(8.75));
        assert!(b.matches(8.755));
        assert!(!b.matches(9.0));
    }

    #[test]
    fn test_breakdown_shares() {
        let b = CostBreakdown { material: 5.0, labor: 3.0, overhead: 2.0 };
        let shares = b.shares(10.0);
        assert_eq!(shares.material, 50.0);
        assert_eq!(shares.labor, 30.0);
        assert_eq!(b.shares(0.0).overhead, 0.0);
    }

    #[test]
    fn test_sheet_aggregates() {
        let sheet: CostingSheet = serde_json::from_str(
            r#"{
                "estimatedCostPerUnit": 9.0,
                "bom": [
                    {"item": "Shell", "quantity": 1.5, "unitPrice": 3.0, "total": 4.5},
                    {"item": "Thread", "quantity": 1, "unitPrice": 0.5, "total": 0.5}
                ],
                "laborOps": [
                    {"operation": "Side seams", "smv": 4.0, "ratePerMinute": 0.5, "total": 2.0},
                    {"operation": "Hem", "smv": 2.0, "ratePerMinute": 0.5, "total": 1.0}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(sheet.bom_total(), 5.0);
        assert_eq!(sheet.labor_total(), 3.0);
        assert_eq!(sheet.total_smv(), 6.0);
        assert_eq!(sheet.breakdown, CostBreakdown::default());
        assert_eq!(sheet.bom[0].computed_total(), 4.5);
    }
}
