pub mod msg;
pub mod receive;

pub use msg::{
    CurrentEventSequence, Envelope, Event, EventError, Message, RequestEvent, COMPONENT_BROADCAST,
};
pub use receive::{ReceiveHandler, ReceiveProtocol, REQUEST_RETRY_INTERVAL};
