use std::sync::Arc;
use std::time::Duration;

use evlink_parser::{Event, ParsedEvent, Parser};
use tracing::debug;

use crate::msg::{
    CurrentEventSequence, Envelope, EventError, Message, RequestEvent, COMPONENT_BROADCAST,
};

/// Re-request retry cadence. The protocol owns no timer: while
/// [`ReceiveProtocol::pending_request`] is set, call
/// [`ReceiveProtocol::retry_pending_request`] at this interval.
pub const REQUEST_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// A timestamp this far behind the previous one means the peer rebooted
/// rather than reordered.
const TIMESTAMP_REGRESSION_MS: u32 = 10_000;
/// No reboot detection once the previous timestamp gets close to wrapping.
const TIMESTAMP_WRAP_GUARD_MS: u32 = 60_000;

/// Receiver-side callbacks, invoked synchronously from
/// [`ReceiveProtocol::process_message`]. Implementations must not call
/// back into the same protocol instance.
pub trait ReceiveHandler {
    /// Emit a request-event message to the peer.
    fn send_request_event(&mut self, request: RequestEvent);
    /// An in-order event addressed to this station.
    fn handle_event(&mut self, event: ParsedEvent<'_>);
    /// An in-order event whose id has no definition in the store.
    fn handle_unknown_event(&mut self, id: u32);
    /// `num_lost` events are permanently gone.
    fn error(&mut self, num_lost: u16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceCompare {
    Equal,
    Older,
    Newer,
}

/// Classify `incoming` against `expected` with 16-bit wrap-around: a
/// difference of half the sequence space or more means a message from the
/// past.
fn compare_sequence(expected: u16, incoming: u16) -> SequenceCompare {
    if expected == incoming {
        return SequenceCompare::Equal;
    }
    if incoming.wrapping_sub(expected) > 0x7fff {
        SequenceCompare::Older
    } else {
        SequenceCompare::Newer
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SequenceState {
    has_sequence: bool,
    latest_sequence: u16,
    has_current_sequence: bool,
    latest_current_sequence: u16,
    last_timestamp_ms: u32,
}

/// Receive state machine for one remote `(system, component)` peer.
///
/// Single-threaded: [`Self::process_message`] is the sole mutator of the
/// sequence state and must not run reentrantly. Several instances for
/// different peers may share one metadata store.
pub struct ReceiveProtocol<H: ReceiveHandler> {
    metadata: Arc<Parser>,
    peer_system_id: u8,
    peer_component_id: u8,
    our_system_id: u8,
    our_component_id: u8,
    state: SequenceState,
    pending_request: Option<u16>,
    handler: H,
}

impl<H: ReceiveHandler> ReceiveProtocol<H> {
    pub fn new(
        metadata: Arc<Parser>,
        peer_system_id: u8,
        peer_component_id: u8,
        our_system_id: u8,
        our_component_id: u8,
        handler: H,
    ) -> Self {
        Self {
            metadata,
            peer_system_id,
            peer_component_id,
            our_system_id,
            our_component_id,
            state: SequenceState::default(),
            pending_request: None,
            handler,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Last accepted sequence number, once one is held.
    pub fn latest_sequence(&self) -> Option<u16> {
        self.state.has_sequence.then_some(self.state.latest_sequence)
    }

    /// Sequence of the outstanding re-request, if any.
    pub fn pending_request(&self) -> Option<u16> {
        self.pending_request
    }

    /// Re-send the outstanding re-request. Idempotent; does nothing when
    /// no request is outstanding. Wire this to a
    /// [`REQUEST_RETRY_INTERVAL`] timer.
    pub fn retry_pending_request(&mut self) {
        if let Some(sequence) = self.pending_request {
            self.send_request(sequence);
        }
    }

    /// Feed one received message through the state machine.
    pub fn process_message(&mut self, envelope: &Envelope, message: &Message) {
        match message {
            Message::Event(event) => self.process_event(envelope, event),
            Message::CurrentEventSequence(msg) => self.process_current_sequence(msg),
            Message::EventError(msg) => self.process_event_error(msg),
        }
    }

    fn process_event(&mut self, envelope: &Envelope, event: &Event) {
        if envelope.component_id != self.peer_component_id {
            debug!(
                "event from component {} but protocol is bound to {}, dropping",
                envelope.component_id, self.peer_component_id
            );
            return;
        }

        self.check_timestamp_reset(event.time_boot_ms);

        if !self.state.has_sequence {
            // first event from this peer: accept it as-is
            self.state.has_sequence = true;
            self.state.latest_sequence = event.sequence.wrapping_sub(1);
        }

        let expected = self.state.latest_sequence.wrapping_add(1);
        match compare_sequence(expected, event.sequence) {
            SequenceCompare::Older => return, // duplicate
            SequenceCompare::Newer => {
                // gap: ask for the first missing event, drop this one
                self.send_request(expected);
                return;
            }
            SequenceCompare::Equal => {
                self.state.latest_sequence = event.sequence;
                self.state.last_timestamp_ms = event.time_boot_ms;
                if self.pending_request == Some(event.sequence) {
                    self.pending_request = None;
                }
            }
        }

        if self.state.has_current_sequence
            && compare_sequence(self.state.latest_sequence, self.state.latest_current_sequence)
                == SequenceCompare::Newer
        {
            // the peer announced more events than we have seen
            self.send_request(self.state.latest_sequence.wrapping_add(1));
        }

        if event.destination_component != self.our_component_id
            && event.destination_component != COMPONENT_BROADCAST
        {
            return;
        }

        match self.metadata.parse(event) {
            Some(parsed) => self.handler.handle_event(parsed),
            None => self.handler.handle_unknown_event(event.id),
        }
    }

    /// Detect a peer reboot from a large timestamp regression and restart
    /// sequence tracking. Timestamps close to wrapping are exempt.
    fn check_timestamp_reset(&mut self, timestamp_ms: u32) {
        if self.state.last_timestamp_ms == 0 {
            self.state.last_timestamp_ms = timestamp_ms;
            return;
        }
        let regressed = (timestamp_ms as u64 + TIMESTAMP_REGRESSION_MS as u64)
            < self.state.last_timestamp_ms as u64;
        if regressed && self.state.last_timestamp_ms < u32::MAX - TIMESTAMP_WRAP_GUARD_MS {
            debug!(
                "timestamp went back from {} to {}, assuming peer reboot",
                self.state.last_timestamp_ms, timestamp_ms
            );
            self.state.has_sequence = false;
            self.state.has_current_sequence = false;
            self.pending_request = None;
        }
    }

    fn process_current_sequence(&mut self, msg: &CurrentEventSequence) {
        if msg.reset() {
            self.state.has_sequence = false;
        }
        if !self.state.has_sequence {
            self.state.has_sequence = true;
            self.state.latest_sequence = msg.sequence;
        }
        if compare_sequence(self.state.latest_sequence, msg.sequence) == SequenceCompare::Newer {
            // events were emitted that we never received
            self.send_request(self.state.latest_sequence.wrapping_add(1));
        }
        self.state.has_current_sequence = true;
        self.state.latest_current_sequence = msg.sequence;
    }

    fn process_event_error(&mut self, msg: &EventError) {
        if msg.target_system != self.our_system_id
            || msg.target_component != self.our_component_id
        {
            return;
        }
        if msg.sequence != self.state.latest_sequence.wrapping_add(1) {
            return; // stale: not about the event we are waiting for
        }
        let num_lost = msg
            .sequence_oldest_available
            .wrapping_sub(self.state.latest_sequence)
            .wrapping_sub(1);
        self.handler.error(num_lost);
        self.state.latest_sequence = msg.sequence_oldest_available.wrapping_sub(1);
        self.send_request(msg.sequence_oldest_available);
    }

    fn send_request(&mut self, sequence: u16) {
        self.pending_request = Some(sequence);
        self.handler.send_request_event(RequestEvent {
            target_system: self.peer_system_id,
            target_component: self.peer_component_id,
            sequence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_compare_wraps() {
        assert_eq!(compare_sequence(0xffff, 0x0000), SequenceCompare::Newer);
        assert_eq!(compare_sequence(0x0000, 0xffff), SequenceCompare::Older);
        assert_eq!(compare_sequence(0x1234, 0x1234), SequenceCompare::Equal);
        // exactly half the sequence space apart counts as the past
        assert_eq!(compare_sequence(0x0000, 0x8000), SequenceCompare::Older);
        assert_eq!(compare_sequence(0x0000, 0x7fff), SequenceCompare::Newer);
    }

    #[test]
    fn sequence_compare_near_neighbors() {
        assert_eq!(compare_sequence(10, 11), SequenceCompare::Newer);
        assert_eq!(compare_sequence(10, 9), SequenceCompare::Older);
        assert_eq!(compare_sequence(0, 1), SequenceCompare::Newer);
    }
}
