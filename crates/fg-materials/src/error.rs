//! Error types for material algebra and property derivation.

use thiserror::Error;

/// Errors raised by material operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    /// Two materials of different concrete types were combined.
    #[error("Cannot combine {left} with {right}")]
    Mismatch { left: String, right: String },

    /// A derived property is undefined for the current extrinsic state.
    #[error("Division undefined: {what}")]
    DivisionUndefined { what: &'static str },

    #[error("Non-physical value for {what}: {value}")]
    NonPhysical { what: &'static str, value: f64 },

    #[error("Not supported: {what}")]
    NotSupported { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type MaterialResult<T> = Result<T, MaterialError>;
