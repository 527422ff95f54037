//! C3 — F-series packet decoder.
//!
//! Per-type offset table for the status/control packet family, plus the
//! changed-bit semantics: a bit is set iff the post-decode value differs
//! from the pre-decode value.

use byteorder::{BigEndian, ByteOrder};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::packet::Packet;
use crate::state::{Changed, FanMode, HvacState, Mode};

pub const PKT_TYPE_STATUS_10: u8 = 0x10;
pub const PKT_TYPE_STATUS_11: u8 = 0x11;
pub const PKT_TYPE_DATETIME_12: u8 = 0x12;
pub const PKT_TYPE_STATUS_13: u8 = 0x13;
pub const PKT_TYPE_STATUS_14: u8 = 0x14;
pub const PKT_TYPE_STATUS_15: u8 = 0x15;
pub const PKT_TYPE_STATUS_16: u8 = 0x16;
pub const PKT_TYPE_CTRL_38: u8 = 0x38;
pub const PKT_TYPE_CTRL_3B: u8 = 0x3B;
pub const PKT_TYPE_COUNTER_A3: u8 = 0xA3;

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Shared extraction for 0x10/0x38/0x3B: power/mode/setpoints/fan. Returns
/// whether the packet set `data_valid` (all three of these do).
fn decode_status_fields(payload: &[u8], state: &mut HvacState) {
    if let Some(&b0) = payload.get(0) {
        let pwr = b0 & 0x01 != 0;
        if pwr != state.power {
            state.changed |= Changed::POWER;
        }
        state.power = pwr;
    }
    if let Some(&b2) = payload.get(2) {
        let m = Mode::decode(b2);
        if m != state.mode {
            state.changed |= Changed::MODE;
        }
        state.mode = m;
    }
    if let Some(&b4) = payload.get(4) {
        let tc = b4 as i16 * 10;
        if tc != state.target_temp_cool {
            state.changed |= Changed::TEMP_COOL;
        }
        state.target_temp_cool = tc;
    }
    if let Some(&b6) = payload.get(6) {
        let fc = FanMode::decode(b6);
        if fc != state.fan_mode_cool {
            state.changed |= Changed::FAN_COOL;
        }
        state.fan_mode_cool = fc;
    }
    if let Some(&b8) = payload.get(8) {
        let th = b8 as i16 * 10;
        if th != state.target_temp_heat {
            state.changed |= Changed::TEMP_HEAT;
        }
        state.target_temp_heat = th;
    }
    if let Some(&b10) = payload.get(10) {
        let fh = FanMode::decode(b10);
        if fh != state.fan_mode_heat {
            state.changed |= Changed::FAN_HEAT;
        }
        state.fan_mode_heat = fh;
    }
    state.recompute_running();
    state.data_valid = true;
}

/// Decode a single F-series packet and fold it into `state`, setting bits
/// in `state.changed` for every field that actually changes value.
///
/// Packets shorter than 4 bytes (`src+dst+type+crc`) are ignored entirely —
/// `state` is left bitwise identical and `packet_count` is **not**
/// incremented.
pub fn decode(pkt: &Packet, state: &mut HvacState) {
    if pkt.len() < 4 {
        return;
    }

    let payload = pkt.payload();
    match pkt.packet_type() {
        Some(PKT_TYPE_STATUS_10) | Some(PKT_TYPE_CTRL_38) => {
            decode_status_fields(payload, state);
        }
        Some(PKT_TYPE_CTRL_3B) => {
            decode_status_fields(payload, state);
            if let Some(&z) = payload.get(17) {
                if z != state.active_zones {
                    state.changed |= Changed::ZONES;
                }
                state.active_zones = z;
            }
        }
        Some(PKT_TYPE_STATUS_11) => {
            if let Some(&b0) = payload.get(0) {
                let rt = b0 as i16 * 10;
                if rt != state.room_temp {
                    state.changed |= Changed::ROOM_TEMP;
                }
                state.room_temp = rt;
            }
            if let Some(&b2) = payload.get(2) {
                let ot = (b2 as i8) as i16 * 10;
                if ot != state.outdoor_temp {
                    state.changed |= Changed::OUTDOOR_TEMP;
                }
                state.outdoor_temp = ot;
            }
        }
        Some(PKT_TYPE_DATETIME_12) => {
            // Date/time — not part of the consolidated state.
        }
        Some(PKT_TYPE_STATUS_13) => {
            // Dual encoding: short payloads carry an 8-bit code, longer
            // ones a 16-bit big-endian code. Field-observed bus traffic
            // uses both forms depending on unit family.
            if payload.len() >= 3 {
                let ec = BigEndian::read_u16(&payload[1..3]);
                if ec != state.error_code {
                    state.changed |= Changed::ERROR_CODE;
                }
                state.error_code = ec;
            } else if let Some(&b0) = payload.get(0) {
                let ec = b0 as u16;
                if ec != state.error_code {
                    state.changed |= Changed::ERROR_CODE;
                }
                state.error_code = ec;
            }
        }
        Some(PKT_TYPE_STATUS_14) => {
            if payload.len() >= 2 {
                let cf = BigEndian::read_u16(&payload[0..2]);
                if cf != state.compressor_freq {
                    state.changed |= Changed::COMPRESSOR;
                }
                state.compressor_freq = cf;
            }
            if payload.len() >= 4 {
                let fr = BigEndian::read_u16(&payload[2..4]);
                if fr != state.flow_rate {
                    state.changed |= Changed::FLOW_RATE;
                }
                state.flow_rate = fr;
            }
        }
        Some(PKT_TYPE_STATUS_15) => {
            if let Some(&b0) = payload.get(0) {
                let dhw = b0 & 0x01 != 0;
                if dhw != state.dhw_active {
                    state.changed |= Changed::DHW;
                }
                state.dhw_active = dhw;
            }
            if let Some(&b1) = payload.get(1) {
                let dt = b1 as i16 * 10;
                if dt != state.dhw_target {
                    state.changed |= Changed::DHW;
                }
                state.dhw_target = dt;
            }
            if let Some(&b2) = payload.get(2) {
                let da = b2 as i16 * 10;
                if da != state.dhw_temp {
                    state.changed |= Changed::DHW;
                }
                state.dhw_temp = da;
            }
            if payload.len() >= 5 {
                let lwt = BigEndian::read_i16(&payload[3..5]);
                if lwt != state.leaving_water_temp {
                    state.changed |= Changed::WATER_TEMPS;
                }
                state.leaving_water_temp = lwt;
            }
            if payload.len() >= 7 {
                let rwt = BigEndian::read_i16(&payload[5..7]);
                if rwt != state.return_water_temp {
                    state.changed |= Changed::WATER_TEMPS;
                }
                state.return_water_temp = rwt;
            }
        }
        Some(PKT_TYPE_STATUS_16) => {
            if payload.len() >= 2 {
                let ec = BigEndian::read_u16(&payload[0..2]);
                if ec != state.error_code {
                    state.changed |= Changed::ERROR_CODE;
                }
                state.error_code = ec;
            }
        }
        Some(PKT_TYPE_COUNTER_A3) => {
            if payload.len() >= 8 {
                let oh = BigEndian::read_u32(&payload[0..4]);
                if oh != state.operation_hours {
                    state.changed |= Changed::OP_HOURS;
                }
                state.operation_hours = oh;

                let cs = BigEndian::read_u32(&payload[4..8]);
                if cs != state.compressor_starts {
                    state.changed |= Changed::COMP_STARTS;
                }
                state.compressor_starts = cs;
            }
        }
        _ => {
            log::debug!("p1p2: unhandled packet type (len={})", pkt.len());
        }
    }

    state.last_update_us = now_us();
    state.packet_count += 1;
}
