//! Error taxonomy for path planning runs.

use crate::grid::CellIndex;
use thiserror::Error;

/// Fatal conditions raised while planning a path.
///
/// Weather outages are not represented here: the weather client recovers
/// them locally by falling back to calm wind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Input grids are not co-registered or have inconsistent shapes.
    #[error("input mismatch: {0}")]
    InputMismatch(String),

    /// A start or end point is off the grid or sits on an impassable cell.
    #[error("invalid coordinate ({x}, {y}): {reason}")]
    InvalidCoordinate { x: f64, y: f64, reason: String },

    /// Start and destination resolve to the same cell.
    #[error("degenerate input: start and destination share cell {cell}")]
    DegenerateInput { cell: CellIndex },

    /// The destination was never settled by the cost-distance propagation.
    #[error("destination {destination} is unreachable from start {start} on {width}x{height} grid")]
    Unreachable {
        start: CellIndex,
        destination: CellIndex,
        width: usize,
        height: usize,
    },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A slope outside [0, 90) degrees reached the classifier.
    #[error("slope {slope_deg} deg at {cell} is outside [0, 90)")]
    InvalidSlope { cell: CellIndex, slope_deg: f64 },

    /// Back-link walk left the grid or did not terminate within width x height steps.
    #[error("corrupt back-link grid at {cell} after {steps} steps")]
    CorruptBackLinks { cell: CellIndex, steps: usize },

    #[error("path length {length_m:.1} exceeds maximum range {max_range_m:.1}")]
    RangeExceeded { length_m: f64, max_range_m: f64 },

    /// The caller's deadline passed while propagating costs.
    #[error("deadline exceeded after settling {settled} of {total} cells")]
    Deadline { settled: usize, total: usize },
}

impl PlanError {
    /// Stable snake_case tag for this error, suitable for API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::InputMismatch(_) => "input_mismatch",
            PlanError::InvalidCoordinate { .. } => "invalid_coordinate",
            PlanError::DegenerateInput { .. } => "degenerate_input",
            PlanError::Unreachable { .. } => "unreachable",
            PlanError::InvalidParameter { .. } => "invalid_parameter",
            PlanError::InvalidSlope { .. } => "invalid_slope",
            PlanError::CorruptBackLinks { .. } => "corrupt_back_links",
            PlanError::RangeExceeded { .. } => "range_exceeded",
            PlanError::Deadline { .. } => "deadline",
        }
    }
}
