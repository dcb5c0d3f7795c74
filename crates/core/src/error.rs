use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("missing 'city'")]
    MissingCity,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}
