use std::borrow::Cow;

/// An inbound message: opaque payload routed by subject.
///
/// Ownership moves from the transport into exactly one handler queue, and
/// from that queue into exactly one handler invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Routing key.
    pub subject: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
    /// Optional reply subject.
    pub reply: Option<String>,
}

impl Message {
    /// Creates a message without a reply subject.
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
            reply: None,
        }
    }

    /// Attaches a reply subject.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Payload as text (lossy).
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
