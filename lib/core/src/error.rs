use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{component} used before it was fitted")]
    NotFitted { component: &'static str },

    #[error("Value for {feature} must be between {min:.2} and {max:.2}")]
    OutOfRange {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid value for {feature}")]
    NotNumeric { feature: String, min: f64, max: f64 },

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for errors caused by the caller's query rather than the service.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::OutOfRange { .. } | Error::NotNumeric { .. })
    }

    /// The offending feature key and its valid bounds, for validation errors.
    pub fn validation_bounds(&self) -> Option<(&str, f64, f64)> {
        match self {
            Error::OutOfRange { feature, min, max, .. } | Error::NotNumeric { feature, min, max } => {
                Some((feature.as_str(), *min, *max))
            }
            _ => None,
        }
    }
}
