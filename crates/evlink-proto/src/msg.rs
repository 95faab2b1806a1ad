pub use evlink_parser::Event;

/// Destination component sentinel addressing every component on the
/// station's system.
pub const COMPONENT_BROADCAST: u8 = 0;

/// Sender ids from the transport envelope of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub system_id: u8,
    pub component_id: u8,
}

/// Vehicle-side announcement of the newest emitted sequence number. Sent
/// periodically so a silent stream still reveals lost events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentEventSequence {
    pub flags: u8,
    pub sequence: u16,
}

impl CurrentEventSequence {
    /// Flag bit: the peer restarted its sequence counter.
    pub const FLAG_RESET: u8 = 0x01;

    pub fn reset(&self) -> bool {
        self.flags & Self::FLAG_RESET != 0
    }
}

/// Peer-side report that a requested event is no longer retrievable;
/// `sequence_oldest_available` is the oldest one still held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventError {
    pub target_system: u8,
    pub target_component: u8,
    pub sequence: u16,
    pub sequence_oldest_available: u16,
}

/// Outbound request for a missed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEvent {
    pub target_system: u8,
    pub target_component: u8,
    pub sequence: u16,
}

/// Inbound messages consumed by the receive protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Event(Event),
    CurrentEventSequence(CurrentEventSequence),
    EventError(EventError),
}
