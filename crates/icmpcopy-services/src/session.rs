//! Receiver session state machine.
//!
//! A session is never negotiated; the receiver only watches the identifier
//! field. The first control packet opens it, the second closes it for good.
//! Data packets count only while open. Sequence numbers are not consulted,
//! so payloads are accepted in arrival order.

use icmpcopy_core::Packet;

/// Where the receiver stands in the single session it will ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for the open signal. Data packets are dropped.
    #[default]
    Closed,
    /// Open signal seen. Data packets are written out.
    Open,
    /// Close signal seen. The loop must stop; the session cannot reopen.
    Terminated,
}

/// What the receive loop should do with the packet just classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ignore,
    AppendPayload,
    StopLoop,
}

/// Pure transition function: no I/O, no side effects.
pub fn transition(state: SessionState, packet: &Packet) -> (SessionState, Action) {
    match state {
        SessionState::Closed if packet.is_control() => (SessionState::Open, Action::Ignore),
        SessionState::Open if packet.is_control() => (SessionState::Terminated, Action::StopLoop),
        SessionState::Open if packet.is_data() => (SessionState::Open, Action::AppendPayload),
        other => (other, Action::Ignore),
    }
}
