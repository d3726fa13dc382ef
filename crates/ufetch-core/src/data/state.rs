use std::fmt;

/// Lifecycle of a single fetch.
///
/// Transitions only move forward:
/// Idle → Connecting → Requesting → AwaitingHeaders → StreamingBody → Done
///
/// Following a redirect returns AwaitingHeaders to Connecting. Any
/// non-terminal state may move to Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Requesting,
    AwaitingHeaders,
    StreamingBody,
    Done,
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Done | ConnectionState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Connecting)
            | (Connecting, Requesting)
            | (Requesting, AwaitingHeaders)
            | (AwaitingHeaders, StreamingBody)
            | (AwaitingHeaders, Connecting)
            | (StreamingBody, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Requesting => "Requesting",
            ConnectionState::AwaitingHeaders => "AwaitingHeaders",
            ConnectionState::StreamingBody => "StreamingBody",
            ConnectionState::Done => "Done",
            ConnectionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}
