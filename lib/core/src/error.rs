use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Precondition failures that abort a comparison
///
/// Data-level disagreements (missing values, wrong-type values,
/// below-threshold pairs) never surface here; they become
/// classification outcomes in the result tree.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] stickler_schema::SchemaError),

    #[error("Record is not an instance of schema '{0}'")]
    TypeMismatch(String),

    #[error("Comparator '{0}' is not registered")]
    UnknownComparator(String),

    #[error("Comparison cancelled")]
    Cancelled,
}
