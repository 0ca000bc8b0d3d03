//! Spec Engine - Single Entry Point
//!
//! CRITICAL: quote MUST call validate internally. No bypass.

use serde::{Deserialize, Serialize};

use crate::costing::{
    format_money, BreakdownShares, CostDeriver, CostingSheet, PricePoints, PricingConfiguration,
    PricingPolicy,
};
use crate::error::EngineError;
use crate::grading::{GradingConfiguration, GradingPolicy, MeasurementGrader, MeasurementPoint};
use crate::hashing::fingerprint;
use crate::sizes::Size;
use crate::units::{format_measurement, to_display_unit};
use crate::validation::{ValidationResult, Validator};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub points: Vec<MeasurementPoint>,
    pub sizes: Vec<Size>,
    pub configuration: GradingConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedCell {
    pub size: Size,
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedRow {
    pub point: String,
    pub description: String,
    /// Base value in the display unit, before shrinkage and allowance
    pub base: String,
    pub cells: Vec<GradedCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedTable {
    pub engine_version: String,
    pub configuration: GradingConfiguration,
    pub sizes: Vec<Size>,
    pub rows: Vec<GradedRow>,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub sheet: CostingSheet,
    pub pricing: PricingConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub engine_version: String,
    pub currency: String,
    pub unit_cost: f64,
    pub markup_percentage: f64,
    pub prices: PricePoints,
    pub wholesale_display: String,
    pub retail_display: String,
    pub breakdown_total: f64,
    pub breakdown_shares: BreakdownShares,
    pub bom_total: f64,
    pub labor_total: f64,
    pub validation: ValidationResult,
    pub fingerprint: String,
}

/// Single entry point for grading and pricing
#[derive(Default)]
pub struct SpecEngine {
    grader: MeasurementGrader,
    deriver: CostDeriver,
    validator: Validator,
}

impl SpecEngine {
    pub fn new(grading: GradingPolicy, pricing: PricingPolicy) -> Self {
        Self {
            grader: MeasurementGrader::new(grading),
            deriver: CostDeriver::new(pricing),
            validator: Validator::new(),
        }
    }

    pub fn grader(&self) -> &MeasurementGrader {
        &self.grader
    }

    pub fn deriver(&self) -> &CostDeriver {
        &self.deriver
    }

    /// Grade every point for every requested size. Linear in points x sizes.
    pub fn grade_table(&self, request: &GradeRequest) -> Result<GradedTable, EngineError> {
        if request.sizes.is_empty() {
            return Err(EngineError::invalid_config("at least one size is required"));
        }
        let config = &request.configuration;
        let unit = config.unit();

        let rows = request
            .points
            .iter()
            .map(|point| GradedRow {
                point: point.point.clone(),
                description: point.description.clone(),
                base: format_measurement(to_display_unit(point.base, unit), unit),
                cells: request
                    .sizes
                    .iter()
                    .map(|&size| {
                        let value = self.grader.grade_value(point, size, config);
                        GradedCell { size, value, display: format_measurement(value, unit) }
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(points = rows.len(), sizes = request.sizes.len(), "graded table");

        let mut table = GradedTable {
            engine_version: ENGINE_VERSION.to_string(),
            configuration: *config,
            sizes: request.sizes.clone(),
            rows,
            fingerprint: String::new(), // Computed after
        };
        table.fingerprint = fingerprint("graded_table", ENGINE_VERSION, &table)?;
        Ok(table)
    }

    /// Validate a costing sheet
    ///
    /// This is the ONLY validation entry point.
    pub fn validate_sheet(&self, sheet: &CostingSheet) -> ValidationResult {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        self.validator.validate(sheet)
    }

    /// Price a costing sheet
    ///
    /// CRITICAL: This ALWAYS calls validate_sheet internally. No bypass possible.
    pub fn quote(&self, request: &QuoteRequest) -> Result<PriceQuote, EngineError> {
        let sheet = &request.sheet;

        // MANDATORY: Validation is always called. This is non-negotiable.
        let validation = self.validate_sheet(sheet);
        if validation.has_errors() {
            return Err(EngineError::ValidationFailed(validation.error_summary()));
        }

        let markup = request.pricing.markup_percentage();
        let prices = self.deriver.derive_prices(sheet.estimated_cost_per_unit, markup)?;

        let mut quote = PriceQuote {
            engine_version: ENGINE_VERSION.to_string(),
            currency: sheet.currency.clone(),
            unit_cost: sheet.estimated_cost_per_unit,
            markup_percentage: markup,
            prices,
            wholesale_display: format_money(prices.wholesale),
            retail_display: format_money(prices.retail),
            breakdown_total: sheet.breakdown.total(),
            breakdown_shares: sheet.breakdown_shares(),
            bom_total: sheet.bom_total(),
            labor_total: sheet.labor_total(),
            validation,
            fingerprint: String::new(), // Computed after
        };
        quote.fingerprint = fingerprint("price_quote", ENGINE_VERSION, &quote)?;
        Ok(quote)
    }
}
