use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite coordinate for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Inverted bounds: min ({min_x}, {min_y}) exceeds max ({max_x}, {max_y})")]
    InvertedBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}
