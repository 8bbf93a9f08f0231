//! Parse errors for the model enums

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown chart: {0}")]
    UnknownChart(String),

    #[error("Unknown theme: {0} (expected light or dark)")]
    UnknownTheme(String),

    #[error("Invalid cholesterol level: {0}")]
    InvalidCholesterol(u8),
}
