use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlacementError>;

#[derive(Debug, Error)]
pub enum PlacementError {
    /// Malformed board, catalog, configuration or placement data. Never silently corrected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The search used its whole budget without reaching a placement that satisfies every hard constraint. This does
    /// not mean no such placement exists; a larger budget or another seed may find one.
    #[error("no feasible placement found within {rounds} rounds (best hard violation {best_hard_score:.3})")]
    InfeasibleWithinBudget { rounds: u64, best_hard_score: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PlacementError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PlacementError::InvalidInput(message.into())
    }
}
