//! C6 — control response engine.
//!
//! Builds the reply to a 0x38/0x3B control request: echo the relevant
//! request fields into the (differently laid out) response payload, then
//! overlay any pending writes from the [`WriteQueue`], then append the
//! CRC. The response payload layout is more compact than the
//! request/decode layout in `decode.rs` — no padding byte between fields.

use crate::crc::crc8;
use crate::decode::{PKT_TYPE_CTRL_38, PKT_TYPE_CTRL_3B};
use crate::model::HvacModel;
use crate::packet::{Packet, ADDR_AUX_CTRL, DST_AUX_CTRL};
use crate::queue::WriteQueue;

pub const RSP_POWER: u8 = 0;
pub const RSP_MODE: u8 = 1;
pub const RSP_COOL_TEMP: u8 = 2;
pub const RSP_FAN_COOL: u8 = 4;
pub const RSP_HEAT_TEMP: u8 = 6;
pub const RSP_FAN_HEAT: u8 = 8;
pub const RSP_DHW_POWER: u8 = 10;
pub const RSP_DHW_TEMP: u8 = 11;
pub const RSP_ZONES: u8 = 16;
pub const RSP_FAN_MODE: u8 = 17;

// Decode-layout (request) offsets these fields echo from.
const REQ_POWER: usize = 0;
const REQ_MODE: usize = 2;
const REQ_COOL_TEMP: usize = 4;
const REQ_FAN_COOL: usize = 6;
const REQ_HEAT_TEMP: usize = 8;
const REQ_FAN_HEAT: usize = 10;
const REQ_ZONES: usize = 17;
const REQ_FAN_MODE: usize = 18;

/// Build the reply to a control request addressed to `model`.
///
/// Returns an empty [`Packet`] (length 0) when the request isn't
/// addressed to the aux controller, or its type doesn't match what
/// `model` expects — neither is an error the bridge needs to branch on,
/// so there's nothing to propagate.
/// Request types with no payload of their own — header-only reply, CRC
/// appended, nothing echoed or overlaid.
const EMPTY_REQUEST_TYPES: [u8; 6] = [0x35, 0x36, 0x37, 0x39, 0x3A, 0x3C];

pub fn build_response(request: &Packet, model: HvacModel, queue: &mut WriteQueue) -> Packet {
    if request.dst() != Some(DST_AUX_CTRL) {
        return Packet::new(&[], false);
    }
    match request.packet_type() {
        Some(PKT_TYPE_CTRL_38) if model.accepts(PKT_TYPE_CTRL_38) => {
            build_response_38(request, model, queue)
        }
        Some(PKT_TYPE_CTRL_3B) if model.accepts(PKT_TYPE_CTRL_3B) => {
            build_response_3b(request, queue)
        }
        Some(PKT_TYPE_CTRL_38) | Some(PKT_TYPE_CTRL_3B) => Packet::new(&[], false),
        Some(t) if EMPTY_REQUEST_TYPES.contains(&t) => build_response_empty(request, t),
        // Unrecognised request type (status packets like 0x10, or anything
        // not in the documented request set) — no reply.
        Some(_) | None => Packet::new(&[], false),
    }
}

fn echo_byte(payload: &[u8], offset: usize) -> u8 {
    payload.get(offset).copied().unwrap_or(0)
}

fn overlay(buf: &mut [u8], queue: &WriteQueue, packet_type: u8) {
    for entry in queue.entries().iter().filter(|e| e.packet_type == packet_type) {
        let idx = entry.offset as usize;
        if let Some(slot) = buf.get_mut(idx) {
            *slot = (*slot & entry.mask) | entry.value;
        }
    }
}

fn build_response_38(request: &Packet, model: HvacModel, queue: &mut WriteQueue) -> Packet {
    debug_assert!(model == HvacModel::Bcl || model == HvacModel::P);
    let payload_len = model.response_len() - 4;
    build_status_response(request, payload_len, queue, false)
}

fn build_response_3b(request: &Packet, queue: &mut WriteQueue) -> Packet {
    let payload_len = HvacModel::M.response_len() - 4;
    build_status_response(request, payload_len, queue, true)
}

fn build_status_response(
    request: &Packet,
    payload_len: usize,
    queue: &mut WriteQueue,
    with_zones: bool,
) -> Packet {
    let req_payload = request.payload();
    let mut buf = [0u8; 32];
    let total_len = payload_len + 4;
    if total_len > buf.len() {
        return Packet::new(&[], false);
    }

    // header: our own aux address, reply routed back to the requester,
    // type echoed as-is
    buf[0] = ADDR_AUX_CTRL;
    buf[1] = request.src().unwrap_or(0);
    buf[2] = request.packet_type().unwrap_or(0);

    let payload = &mut buf[3..3 + payload_len];
    payload[RSP_POWER as usize] = echo_byte(req_payload, REQ_POWER);
    payload[RSP_MODE as usize] = echo_byte(req_payload, REQ_MODE);
    payload[RSP_COOL_TEMP as usize] = echo_byte(req_payload, REQ_COOL_TEMP);
    payload[RSP_FAN_COOL as usize] = echo_byte(req_payload, REQ_FAN_COOL);
    payload[RSP_HEAT_TEMP as usize] = echo_byte(req_payload, REQ_HEAT_TEMP);
    payload[RSP_FAN_HEAT as usize] = echo_byte(req_payload, REQ_FAN_HEAT);
    // DHW fields have no echo source in a control request; start at zero.
    payload[RSP_DHW_POWER as usize] = 0;
    payload[RSP_DHW_TEMP as usize] = 0;
    if with_zones {
        payload[RSP_ZONES as usize] = echo_byte(req_payload, REQ_ZONES);
        payload[RSP_FAN_MODE as usize] = echo_byte(req_payload, REQ_FAN_MODE);
    }

    overlay(&mut buf[3..3 + payload_len], queue, buf[2]);
    queue.tick();

    let crc_idx = 3 + payload_len;
    buf[crc_idx] = crc8(&buf[..crc_idx]);
    Packet::new(&buf[..total_len], false)
}

/// Header-only reply for request types with no payload (0x39/0x3A/0x3C):
/// addresses swapped, CRC appended, nothing else.
fn build_response_empty(request: &Packet, request_type: u8) -> Packet {
    let buf = [ADDR_AUX_CTRL, request.src().unwrap_or(0), request_type];
    let crc = crc8(&buf);
    Packet::new(&[buf[0], buf[1], buf[2], crc], false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req38(bytes: &[u8]) -> Packet {
        let mut full = vec![0x00u8, DST_AUX_CTRL, 0x38];
        full.extend_from_slice(bytes);
        full.push(0xAA);
        Packet::new(&full, false)
    }

    #[test]
    fn model_mismatch_yields_empty_response() {
        let mut q = WriteQueue::new();
        let req = req38(&[0x01, 0x00, 0x02, 0x00, 0x18]);
        let resp = build_response(&req, HvacModel::M, &mut q);
        assert_eq!(resp.len(), 0);
    }

    #[test]
    fn bcl_echoes_power_and_setpoints() {
        let mut q = WriteQueue::new();
        let req = req38(&[
            0x01, 0x00, 0x02, 0x00, 0x18, 0x00, 0x31, 0x00, 0x16, 0x00, 0x11,
        ]);
        let resp = build_response(&req, HvacModel::Bcl, &mut q);
        assert_eq!(resp.len(), 18);
        assert_eq!(resp.src(), Some(ADDR_AUX_CTRL));
        assert_eq!(resp.dst(), Some(0x00));
        let payload = resp.payload();
        assert_eq!(payload[RSP_POWER as usize], 0x01);
        assert_eq!(payload[RSP_MODE as usize], 0x02);
        assert_eq!(payload[RSP_COOL_TEMP as usize], 0x18);
        assert_eq!(payload[RSP_FAN_COOL as usize], 0x31);
        assert_eq!(payload[RSP_HEAT_TEMP as usize], 0x16);
        assert_eq!(payload[RSP_FAN_HEAT as usize], 0x11);
        // response CRC folds to zero over the whole packet
        assert_eq!(crc8(resp.as_slice()), 0);
    }

    #[test]
    fn request_not_addressed_to_aux_is_ignored() {
        let mut q = WriteQueue::new();
        let req = Packet::new(
            &[0x00, 0x80, 0x38, 0x01, 0x00, 0x02, 0x00, 0x18, 0xAA],
            false,
        );
        assert_eq!(build_response(&req, HvacModel::Bcl, &mut q).len(), 0);
    }

    #[test]
    fn overlay_applies_queued_write_over_echo() {
        let mut q = WriteQueue::new();
        q.push(0x38, RSP_POWER, 0xFE, 0x00).unwrap();
        let req = req38(&[0x01, 0x00, 0x02, 0x00, 0x18]);
        let resp = build_response(&req, HvacModel::P, &mut q);
        assert_eq!(resp.payload()[RSP_POWER as usize], 0x00);
    }

    #[test]
    fn overlay_skips_entry_queued_for_a_different_packet_type() {
        let mut q = WriteQueue::new();
        q.push(0x3B, RSP_POWER, 0xFE, 0x00).unwrap();
        let req = req38(&[0x01, 0x00, 0x02, 0x00, 0x18]);
        let resp = build_response(&req, HvacModel::P, &mut q);
        assert_eq!(resp.payload()[RSP_POWER as usize], 0x01);
    }

    #[test]
    fn unrecognised_request_type_to_aux_yields_no_reply() {
        let mut q = WriteQueue::new();
        let req = Packet::new(&[0x00, DST_AUX_CTRL, 0x10, 0x01, 0xAA], false);
        assert_eq!(build_response(&req, HvacModel::Bcl, &mut q).len(), 0);

        let req = Packet::new(&[0x00, DST_AUX_CTRL, 0x99, 0xAA], false);
        assert_eq!(build_response(&req, HvacModel::Bcl, &mut q).len(), 0);
    }

    #[test]
    fn m_model_3b_echoes_zones_and_fan_mode() {
        let mut q = WriteQueue::new();
        let mut req = vec![0x00u8, DST_AUX_CTRL, 0x3B];
        req.resize(21, 0);
        req[3] = 0x01; // power
        req[20] = 0x07; // zones (request offset 17)
        req.push(0x01); // fan mode (request offset 18)
        req.push(0xAA); // CRC
        let req = Packet::new(&req, false);

        let resp = build_response(&req, HvacModel::M, &mut q);
        assert_eq!(resp.len(), 22);
        assert_eq!(resp.payload()[RSP_ZONES as usize], 0x07);
        assert_eq!(resp.payload()[RSP_FAN_MODE as usize], 0x01);
    }

    #[test]
    fn m_rejects_38_and_bcl_rejects_3b() {
        let mut q = WriteQueue::new();
        let request_38 = req38(&[0x01]);
        assert_eq!(build_response(&request_38, HvacModel::M, &mut q).len(), 0);

        let mut full = vec![0x00u8, DST_AUX_CTRL, 0x3B, 0x01];
        full.resize(21, 0);
        full.push(0xAA);
        let request_3b = Packet::new(&full, false);
        assert_eq!(build_response(&request_3b, HvacModel::Bcl, &mut q).len(), 0);
    }

    #[test]
    fn empty_request_type_gets_3_byte_header_reply() {
        let mut q = WriteQueue::new();
        let req = Packet::new(&[0x00, DST_AUX_CTRL, 0x39, 0xAA], false);
        let resp = build_response(&req, HvacModel::Bcl, &mut q);
        assert_eq!(resp.len(), 4);
    }

    #[test]
    fn retry_exhaustion_reverts_field_to_pure_echo() {
        let mut q = WriteQueue::new();
        q.push(0x38, RSP_POWER, 0xFE, 0x00).unwrap();
        let req = req38(&[0x01, 0x00, 0x02, 0x00, 0x18]);
        for _ in 0..crate::queue::MAX_RETRIES {
            build_response(&req, HvacModel::P, &mut q);
        }
        assert!(q.is_empty());
        let resp = build_response(&req, HvacModel::P, &mut q);
        assert_eq!(resp.payload()[RSP_POWER as usize], 0x01);
    }
}
