use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unsafe sort parameter: {0}")]
    UnsafeSort(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),
}
