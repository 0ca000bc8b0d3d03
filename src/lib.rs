//! Garment Spec Core - Grading and Costing Engine
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Base Size Is Truth (every graded value is recomputed from base + increment)
//! 2. Centimeters Are Canonical (conversion happens last)
//! 3. Malformed Numbers Degrade To Zero, Invalid Configuration Is Rejected
//! 4. Upstream Cost Is Authoritative (breakdowns are reported, never reconciled)
//! 5. Pure And Synchronous (no I/O outside the payload loaders)

pub mod error;
pub mod units;
pub mod sizes;
pub mod grading;
pub mod costing;
pub mod validation;
pub mod payload;
pub mod hashing;
pub mod pipeline;

pub use error::EngineError;
pub use units::{to_display_unit, to_cm, format_measurement, Unit, CM_PER_INCH};
pub use sizes::{Size, SizeMix, SizeRange};
pub use grading::{
    grade, grade_value, parse_signed_decimal, GradingConfiguration, GradingPolicy, GradingProfile,
    MeasurementGrader, MeasurementPoint, SEAM_ALLOWANCE_CM,
};
pub use costing::{
    breakdown_total, derive_prices, CostBreakdown, CostDeriver, CostingSheet, PricePoints,
    PricingConfiguration, PricingPolicy, RETAIL_MULTIPLIER,
};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use payload::{parse_costing, parse_pattern, IngestedPattern};
pub use hashing::{canonical_json, fingerprint};
pub use pipeline::{GradeRequest, GradedTable, PriceQuote, QuoteRequest, SpecEngine};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
