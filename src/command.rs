//! C7 — command front-end.
//!
//! Translates the small set of commands the bridge is allowed to issue
//! into overlay entries for the [`WriteQueue`].

use crate::error::ControlResult;
use crate::queue::WriteQueue;
use crate::response::{
    RSP_COOL_TEMP, RSP_DHW_POWER, RSP_DHW_TEMP, RSP_FAN_COOL, RSP_FAN_HEAT, RSP_HEAT_TEMP,
    RSP_MODE, RSP_POWER,
};
use crate::state::{FanMode, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPower(bool),
    SetMode(Mode),
    /// Degrees C x10.
    SetTempCool(i16),
    /// Degrees C x10.
    SetTempHeat(i16),
    SetFanCool(FanMode),
    SetFanHeat(FanMode),
    SetDhwPower(bool),
    /// Degrees C x10.
    SetDhwTemp(i16),
}

const TEMP_COOL_MIN: i16 = 16;
const TEMP_COOL_MAX: i16 = 50;
const DHW_TEMP_MIN: i16 = 30;
const DHW_TEMP_MAX: i16 = 75;

fn clamp_degrees(tenths: i16, min: i16, max: i16) -> u8 {
    (tenths / 10).clamp(min, max) as u8
}

/// Queue the overlay entries implied by `cmd`, tagged with the request
/// packet type the active model answers (`packet_type`). All commands
/// occupy a single offset and so a single queue slot.
pub fn apply_command(queue: &mut WriteQueue, packet_type: u8, cmd: Command) -> ControlResult<()> {
    let (offset, mask, value) = match cmd {
        Command::SetPower(on) => (RSP_POWER, 0xFE, on as u8),
        Command::SetMode(mode) => (RSP_MODE, 0xF8, mode.encode_bits()),
        Command::SetTempCool(tenths) => (
            RSP_COOL_TEMP,
            0x00,
            clamp_degrees(tenths, TEMP_COOL_MIN, TEMP_COOL_MAX),
        ),
        Command::SetTempHeat(tenths) => (
            RSP_HEAT_TEMP,
            0x00,
            clamp_degrees(tenths, TEMP_COOL_MIN, TEMP_COOL_MAX),
        ),
        Command::SetFanCool(fan) => (RSP_FAN_COOL, 0x00, fan.encode_raw()),
        Command::SetFanHeat(fan) => (RSP_FAN_HEAT, 0x00, fan.encode_raw()),
        Command::SetDhwPower(on) => (RSP_DHW_POWER, 0xFE, on as u8),
        Command::SetDhwTemp(tenths) => (
            RSP_DHW_TEMP,
            0x00,
            clamp_degrees(tenths, DHW_TEMP_MIN, DHW_TEMP_MAX),
        ),
    };

    queue.push(packet_type, offset, mask, value)
}
