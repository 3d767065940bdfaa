use crate::envelope::GridAxis;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Calibration gap: {axis} = {value} outside grid range [{min}, {max}]")]
    CalibrationGap {
        axis: GridAxis,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid stall profile: {0}")]
    InvalidProfile(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
