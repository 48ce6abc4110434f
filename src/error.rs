use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong between the data origin and a chart.
///
/// None of these are fatal: the loader turns the first two into an empty or
/// diagnostic dataset, views turn `MissingColumn` into an Empty view, and
/// the trend fit turns `DegenerateFit` into "no overlay".
#[derive(Debug, Error)]
pub enum DashError {
    #[error("resource not found: {origin}")]
    ResourceNotFound { origin: String },

    #[error("{0:#}")]
    ParseOrNetwork(anyhow::Error),

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("degenerate linear fit: {reason}")]
    DegenerateFit { reason: &'static str },
}

impl DashError {
    pub fn missing(column: &str) -> Self {
        DashError::MissingColumn {
            column: column.to_string(),
        }
    }
}
