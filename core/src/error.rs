use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "Retention invariant violated: cohort {cohort} counts {count} customers \
         at offset {offset} but only {base} at offset 0"
    )]
    RetentionInvariant {
        cohort: String,
        offset: u32,
        count: u64,
        base: u64,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
