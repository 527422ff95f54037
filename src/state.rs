//! C4 — consolidated HVAC state record.
//!
//! A plain record updated in place by the decoder and flattened to JSON
//! for the bridge to publish. `Serialize` derives on the domain enums keep
//! that flattening free of a separate DTO layer.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// One bit per semantic group. A flat mask is deliberate: fields that
    /// change together (e.g. the water temperatures) share a bit rather
    /// than each getting independent versioning.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Changed: u16 {
        const POWER        = 1 << 0;
        const MODE         = 1 << 1;
        const TEMP_COOL    = 1 << 2;
        const TEMP_HEAT    = 1 << 3;
        const FAN_COOL     = 1 << 4;
        const FAN_HEAT     = 1 << 5;
        const ROOM_TEMP    = 1 << 6;
        const OUTDOOR_TEMP = 1 << 7;
        const WATER_TEMPS  = 1 << 8;
        const DHW          = 1 << 9;
        const COMPRESSOR   = 1 << 10;
        const FLOW_RATE    = 1 << 11;
        const ERROR_CODE   = 1 << 12;
        const OP_HOURS     = 1 << 13;
        const COMP_STARTS  = 1 << 14;
        const ZONES        = 1 << 15;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Off,
    Heat,
    Cool,
    Auto,
    Fan,
    Dry,
}

impl Mode {
    /// Low 3 bits of the mode byte; any unrecognised value decodes to `Off`.
    pub fn decode(raw: u8) -> Self {
        match raw & 0x07 {
            1 => Mode::Heat,
            2 => Mode::Cool,
            3 => Mode::Auto,
            4 => Mode::Fan,
            5 => Mode::Dry,
            _ => Mode::Off,
        }
    }

    pub fn encode_bits(self) -> u8 {
        match self {
            Mode::Off => 0,
            Mode::Heat => 1,
            Mode::Cool => 2,
            Mode::Auto => 3,
            Mode::Fan => 4,
            Mode::Dry => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Running {
    Idle,
    Heating,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    Low,
    Med,
    High,
    Auto,
}

impl FanMode {
    /// Bits 6:5 of the raw fan byte; any pattern other than 00/01/10
    /// decodes to `Auto`.
    pub fn decode(raw: u8) -> Self {
        match (raw >> 5) & 0x03 {
            0 => FanMode::Low,
            1 => FanMode::Med,
            2 => FanMode::High,
            _ => FanMode::Auto,
        }
    }

    /// Raw wire byte for a command targeting this speed. `Auto` gets the
    /// one raw bit pattern the 2-bit decode table otherwise treats as a
    /// catch-all, since a command has to be able to ask for it explicitly.
    pub fn encode_raw(self) -> u8 {
        match self {
            FanMode::Low => 0x11,
            FanMode::Med => 0x31,
            FanMode::High => 0x51,
            FanMode::Auto => 0x71,
        }
    }
}

/// Consolidated HVAC state, mutated in place by [`crate::decode::decode`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HvacState {
    pub power: bool,
    pub mode: Mode,
    pub running: Running,
    pub target_temp_cool: i16,
    pub target_temp_heat: i16,
    pub fan_mode_cool: FanMode,
    pub fan_mode_heat: FanMode,
    pub room_temp: i16,
    pub outdoor_temp: i16,
    pub leaving_water_temp: i16,
    pub return_water_temp: i16,
    pub dhw_active: bool,
    pub dhw_target: i16,
    pub dhw_temp: i16,
    pub compressor_freq: u16,
    pub flow_rate: u16,
    pub error_code: u16,
    pub operation_hours: u32,
    pub compressor_starts: u32,
    pub packet_count: u32,
    pub active_zones: u8,
    #[serde(skip)]
    pub changed: Changed,
    pub data_valid: bool,
    #[serde(skip)]
    pub last_update_us: u64,
}

impl Default for HvacState {
    fn default() -> Self {
        Self {
            power: false,
            mode: Mode::Off,
            running: Running::Idle,
            target_temp_cool: 0,
            target_temp_heat: 0,
            fan_mode_cool: FanMode::Auto,
            fan_mode_heat: FanMode::Auto,
            room_temp: 0,
            outdoor_temp: 0,
            leaving_water_temp: 0,
            return_water_temp: 0,
            dhw_active: false,
            dhw_target: 0,
            dhw_temp: 0,
            compressor_freq: 0,
            flow_rate: 0,
            error_code: 0,
            operation_hours: 0,
            compressor_starts: 0,
            packet_count: 0,
            active_zones: 0,
            changed: Changed::empty(),
            data_valid: false,
            last_update_us: 0,
        }
    }
}

impl HvacState {
    /// Enforce the `power=false → running=idle` / `mode→running` invariants.
    /// Called after any 0x10/0x38/0x3B decode.
    pub(crate) fn recompute_running(&mut self) {
        self.running = if !self.power {
            Running::Idle
        } else {
            match self.mode {
                Mode::Heat => Running::Heating,
                Mode::Cool => Running::Cooling,
                _ => self.running,
            }
        };
    }
}

/// An atomic, point-in-time copy of [`HvacState`] handed to the bridge.
/// Cloning a `Copy` struct under the state mutex is the entire
/// snapshot critical section.
pub type Snapshot = HvacState;
