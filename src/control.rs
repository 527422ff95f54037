//! C8 — the owned control-core facade.
//!
//! `Controller` is a value the bridge owns and constructs explicitly
//! (`Controller::new`) rather than a process-wide singleton, so tests can
//! spin up as many independent instances as they need without any global
//! teardown. The two critical sections — state vs. publish, and queue vs.
//! bus — are the two `Mutex` fields below.

use esp_idf_hal::mutex::Mutex;

use crate::command::{apply_command as apply_command_to_queue, Command};
use crate::decode::decode as decode_packet;
use crate::error::ControlResult;
use crate::model::HvacModel;
use crate::packet::Packet;
use crate::queue::WriteQueue;
use crate::response::build_response;
use crate::state::{HvacState, Snapshot};

pub struct Controller {
    model: HvacModel,
    state: Mutex<HvacState>,
    queue: Mutex<WriteQueue>,
}

impl Controller {
    pub fn new(model: HvacModel) -> Self {
        Self {
            model,
            state: Mutex::new(HvacState::default()),
            queue: Mutex::new(WriteQueue::new()),
        }
    }

    /// Bus-task entry point: fold a received packet into state, and if
    /// it's a control request this model answers, build the reply.
    ///
    /// Returns `None` when there's nothing to send back — either the
    /// packet wasn't a request (status packets just update state), or it
    /// was a request addressed to a different model.
    pub fn on_packet(&self, pkt: &Packet) -> Option<Packet> {
        {
            let mut state = self.state.lock();
            decode_packet(pkt, &mut state);
        }

        let mut queue = self.queue.lock();
        let resp = build_response(pkt, self.model, &mut queue);
        if resp.is_empty() {
            None
        } else {
            Some(resp)
        }
    }

    /// Publish-task entry point: an atomic copy of the current state,
    /// `changed` included. Does not reset `changed` — use
    /// [`Controller::snapshot_and_clear`] for the publish task's actual
    /// consume-and-clear critical section.
    pub fn snapshot(&self) -> Snapshot {
        *self.state.lock()
    }

    /// Publish-task entry point: copy the current state and reset
    /// `changed` to empty, both under the same state-mutex lock. This is
    /// the snapshot-and-clear-changed critical section — the sole consumer
    /// of the changed-bit mask, which otherwise only ever accumulates.
    pub fn snapshot_and_clear(&self) -> Snapshot {
        let mut state = self.state.lock();
        let snap = *state;
        state.changed = crate::state::Changed::empty();
        snap
    }

    /// Command-task entry point: queue a field override for the next
    /// response this model builds.
    pub fn apply_command(&self, cmd: Command) -> ControlResult<()> {
        let mut queue = self.queue.lock();
        apply_command_to_queue(&mut queue, self.model.request_type(), cmd)
    }

    pub fn model(&self) -> HvacModel {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Mode;

    fn status_10(power: u8, mode: u8) -> Packet {
        Packet::new(
            &[0x00, 0x80, 0x10, power, 0x00, mode, 0x00, 0x18, 0x00, 0x31, 0xAA],
            false,
        )
    }

    #[test]
    fn status_packet_updates_state_without_a_response() {
        let ctrl = Controller::new(HvacModel::Bcl);
        let resp = ctrl.on_packet(&status_10(0x01, 0x02));
        assert!(resp.is_none());
        let snap = ctrl.snapshot();
        assert!(snap.power);
        assert_eq!(snap.mode, Mode::Cool);
    }

    #[test]
    fn control_request_gets_a_response_for_matching_model() {
        let ctrl = Controller::new(HvacModel::P);
        let req = Packet::new(
            &[0x00, crate::packet::DST_AUX_CTRL, 0x38, 0x01, 0x00, 0x02, 0x00, 0x18, 0xAA],
            false,
        );
        let resp = ctrl.on_packet(&req).expect("P model answers 0x38");
        assert_eq!(resp.len(), HvacModel::P.response_len());
    }

    #[test]
    fn control_request_for_wrong_model_gets_no_response() {
        let ctrl = Controller::new(HvacModel::M);
        let req = Packet::new(
            &[0x00, crate::packet::DST_AUX_CTRL, 0x38, 0x01, 0x00, 0x02, 0x00, 0x18, 0xAA],
            false,
        );
        assert!(ctrl.on_packet(&req).is_none());
    }

    #[test]
    fn snapshot_and_clear_resets_changed_bits() {
        let ctrl = Controller::new(HvacModel::Bcl);
        ctrl.on_packet(&status_10(0x01, 0x02));
        assert!(!ctrl.snapshot().changed.is_empty());

        let snap = ctrl.snapshot_and_clear();
        assert!(!snap.changed.is_empty());
        assert!(ctrl.snapshot().changed.is_empty());
    }

    #[test]
    fn queued_command_shows_up_in_next_response() {
        let ctrl = Controller::new(HvacModel::Bcl);
        ctrl.apply_command(Command::SetPower(false)).unwrap();
        let req = Packet::new(
            &[0x00, crate::packet::DST_AUX_CTRL, 0x38, 0x01, 0x00, 0x02, 0x00, 0x18, 0xAA],
            false,
        );
        let resp = ctrl.on_packet(&req).unwrap();
        assert_eq!(resp.payload()[crate::response::RSP_POWER as usize], 0);
    }
}
