use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_ALLOCATION_CATEGORIES: usize = 5;
pub const MAX_ALLOCATION_CATEGORIES: usize = 7;
/// Allowed distance of the percentage sum from 100.
pub const ALLOCATION_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub category: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("expected 5-7 allocation categories, got {0}")]
    CategoryCount(usize),
    #[error("allocation percentages sum to {0}, expected 100")]
    Sum(f64),
    #[error("invalid percentage {percentage} for category '{category}'")]
    Percentage { category: String, percentage: f64 },
    #[error("allocation entry has a blank category")]
    BlankCategory,
}

/// Checks a structured allocation response before it may be rendered.
pub fn validate_allocations(slices: &[AllocationSlice]) -> Result<(), AllocationError> {
    let count = slices.len();
    if !(MIN_ALLOCATION_CATEGORIES..=MAX_ALLOCATION_CATEGORIES).contains(&count) {
        return Err(AllocationError::CategoryCount(count));
    }

    for slice in slices {
        if slice.category.trim().is_empty() {
            return Err(AllocationError::BlankCategory);
        }
        if !slice.percentage.is_finite() || slice.percentage < 0.0 {
            return Err(AllocationError::Percentage {
                category: slice.category.clone(),
                percentage: slice.percentage,
            });
        }
    }

    let sum: f64 = slices.iter().map(|slice| slice.percentage).sum();
    if (sum - 100.0).abs() > ALLOCATION_SUM_TOLERANCE {
        return Err(AllocationError::Sum(sum));
    }
    Ok(())
}
