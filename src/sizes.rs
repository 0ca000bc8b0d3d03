//! Sizes, size ranges and the per-size production mix

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

const SIZE_COUNT: usize = 7;

/// Garment size. M is the base size every grading step is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    Os,
}

impl Size {
    pub const ALL: [Size; SIZE_COUNT] =
        [Size::Xs, Size::S, Size::M, Size::L, Size::Xl, Size::Xxl, Size::Os];

    /// Grading steps away from the base size. OS always grades as the base.
    pub fn step_offset(&self) -> i32 {
        match self {
            Size::Xs => -2,
            Size::S => -1,
            Size::M => 0,
            Size::L => 1,
            Size::Xl => 2,
            Size::Xxl => 3,
            Size::Os => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Size::Xs => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
            Size::Os => "OS",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Size {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Size::ALL
            .iter()
            .copied()
            .find(|size| size.label() == wanted)
            .ok_or_else(|| EngineError::invalid_config(format!("unrecognized size '{}'", s.trim())))
    }
}

/// Target sizing choice offered upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeRange {
    /// XS through XXL
    Full,
    /// S through XL
    Core,
    /// A single one-size garment
    OneSize,
    /// Base size only
    BaseOnly,
}

impl SizeRange {
    /// Classify a free-text sizing description, e.g. "XS-XXL (Base Size L)".
    /// Descriptions that name no known range fall back to the base size only.
    pub fn from_description(description: &str) -> Self {
        if description.contains("One Size") {
            SizeRange::OneSize
        } else if description.contains("XS-XXL") {
            SizeRange::Full
        } else if description.contains("S-XL") {
            SizeRange::Core
        } else {
            SizeRange::BaseOnly
        }
    }

    pub fn sizes(&self) -> Vec<Size> {
        match self {
            SizeRange::Full => vec![Size::Xs, Size::S, Size::M, Size::L, Size::Xl, Size::Xxl],
            SizeRange::Core => vec![Size::S, Size::M, Size::L, Size::Xl],
            SizeRange::OneSize => vec![Size::Os],
            SizeRange::BaseOnly => vec![Size::M],
        }
    }

    /// Size shown first when the range is opened
    pub fn default_size(&self) -> Size {
        match self {
            SizeRange::OneSize => Size::Os,
            _ => Size::M,
        }
    }
}

impl FromStr for SizeRange {
    type Err = EngineError;

    /// Strict parse of the configuration surface. Free text goes through
    /// [`SizeRange::from_description`] instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XS-XXL" | "FULL" => Ok(SizeRange::Full),
            "S-XL" | "CORE" => Ok(SizeRange::Core),
            "OS" | "ONE SIZE" | "ONE_SIZE" => Ok(SizeRange::OneSize),
            "M" | "BASE" => Ok(SizeRange::BaseOnly),
            _ => Err(EngineError::invalid_config(format!(
                "unrecognized size range '{}'",
                s.trim()
            ))),
        }
    }
}

/// Unit counts per size for one production run.
///
/// Every size is always present; counts are unsigned so they can never go
/// below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "BTreeMap<Size, u32>", from = "BTreeMap<Size, u32>")]
pub struct SizeMix {
    counts: [u32; SIZE_COUNT],
}

impl SizeMix {
    /// Empty mix, every size at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Mix holding a single unit of one size
    pub fn single(size: Size) -> Self {
        Self::new().increment(size)
    }

    pub fn increment(mut self, size: Size) -> Self {
        let slot = &mut self.counts[size.index()];
        *slot = slot.saturating_add(1);
        self
    }

    /// Remove one unit; a size already at zero stays at zero
    pub fn decrement(mut self, size: Size) -> Self {
        let slot = &mut self.counts[size.index()];
        *slot = slot.saturating_sub(1);
        self
    }

    /// Set a count directly, flooring negative requests at zero
    pub fn set(mut self, size: Size, value: i64) -> Self {
        self.counts[size.index()] = value.clamp(0, u32::MAX as i64) as u32;
        self
    }

    /// Zero every size
    pub fn reset(self) -> Self {
        Self::new()
    }

    pub fn count(&self, size: Size) -> u32 {
        self.counts[size.index()]
    }

    /// Units in this production run
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Size, u32)> + '_ {
        Size::ALL.iter().map(move |&s| (s, self.count(s)))
    }

    /// Sizes with at least one unit, in size order
    pub fn active_sizes(&self) -> Vec<Size> {
        self.iter().filter(|(_, c)| *c > 0).map(|(s, _)| s).collect()
    }
}

impl From<SizeMix> for BTreeMap<Size, u32> {
    fn from(mix: SizeMix) -> Self {
        mix.iter().collect()
    }
}

impl From<BTreeMap<Size, u32>> for SizeMix {
    fn from(map: BTreeMap<Size, u32>) -> Self {
        let mut mix = SizeMix::new();
        for (size, count) in map {
            mix.counts[size.index()] = count;
        }
        mix
    }
}
