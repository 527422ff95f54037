//! Auxiliary controller core for the Daikin P1/P2 two-wire HVAC bus.
//!
//! This crate implements the protocol core only: CRC, F-series decoding,
//! consolidated state, the bounded write queue, and the control-response
//! engine. Bus framing, MQTT publishing and board bring-up live in the
//! `bus`/`bridge` modules and the `main` binary as thin glue around it.

pub mod command;
pub mod control;
pub mod crc;
pub mod decode;
pub mod error;
pub mod model;
pub mod packet;
pub mod queue;
pub mod response;
pub mod state;

pub use command::Command;
pub use control::Controller;
pub use error::{ControlError, ControlResult};
pub use model::HvacModel;
pub use packet::Packet;
pub use state::{HvacState, Snapshot};
