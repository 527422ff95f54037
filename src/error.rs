//! Typed error values returned across the core's public boundary.
//!
//! The bridge is expected to branch on these, not just log them, so they're
//! a `thiserror` enum rather than an `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Unknown command type, or a value that's obviously out of range.
    #[error("invalid argument")]
    InvalidArg,
    /// The write queue is full and no existing slot matches.
    #[error("write queue full")]
    NoMem,
    /// Operation attempted before `control_init` / `Controller::new`.
    #[error("control core not initialised")]
    InvalidState,
}

pub type ControlResult<T> = Result<T, ControlError>;
