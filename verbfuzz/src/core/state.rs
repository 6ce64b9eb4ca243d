//! Resource kinds and the lifecycle states each kind may occupy.
//!
//! Every kind declares a closed set of states. The resource table refuses to
//! record a state outside that set, so the set doubles as the state machine's
//! vocabulary for a kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Typed family of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Pd,
    Cq,
    CompChannel,
    Qp,
    Srq,
    Mr,
    Mw,
    Ah,
    CmEventChannel,
    CmId,
}

/// Lifecycle state of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Allocated,
    Imported,
    Bound,
    Listening,
    Connected,
    Used,
    Reset,
    Init,
    ReadyToReceive,
    ReadyToSend,
    SendQueueDrained,
    Error,
    Registered,
    Deregistered,
    Destroyed,
    Freed,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Pd,
        ResourceKind::Cq,
        ResourceKind::CompChannel,
        ResourceKind::Qp,
        ResourceKind::Srq,
        ResourceKind::Mr,
        ResourceKind::Mw,
        ResourceKind::Ah,
        ResourceKind::CmEventChannel,
        ResourceKind::CmId,
    ];

    /// Stable lowercase label, also used as the prefix for synthesized names.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Pd => "pd",
            ResourceKind::Cq => "cq",
            ResourceKind::CompChannel => "comp_channel",
            ResourceKind::Qp => "qp",
            ResourceKind::Srq => "srq",
            ResourceKind::Mr => "mr",
            ResourceKind::Mw => "mw",
            ResourceKind::Ah => "ah",
            ResourceKind::CmEventChannel => "cm_event_channel",
            ResourceKind::CmId => "cm_id",
        }
    }

    /// Short prefix for generated resource names (`qp0`, `mr3`, ...).
    pub fn name_prefix(self) -> &'static str {
        match self {
            ResourceKind::CompChannel => "ch",
            ResourceKind::CmEventChannel => "ec",
            ResourceKind::CmId => "id",
            other => other.label(),
        }
    }

    /// Declared state set for this kind.
    pub fn states(self) -> &'static [State] {
        match self {
            ResourceKind::Pd => &[State::Allocated, State::Imported, State::Freed],
            ResourceKind::Cq | ResourceKind::Srq | ResourceKind::Ah => {
                &[State::Allocated, State::Destroyed]
            }
            ResourceKind::CmEventChannel => &[State::Allocated, State::Destroyed],
            ResourceKind::CompChannel => &[State::Allocated, State::Used, State::Destroyed],
            ResourceKind::Qp => &[
                State::Reset,
                State::Init,
                State::ReadyToReceive,
                State::ReadyToSend,
                State::SendQueueDrained,
                State::Error,
                State::Destroyed,
            ],
            ResourceKind::Mr => &[State::Registered, State::Deregistered],
            ResourceKind::Mw => &[State::Allocated, State::Bound, State::Freed],
            ResourceKind::CmId => &[
                State::Allocated,
                State::Bound,
                State::Listening,
                State::Connected,
                State::Destroyed,
            ],
        }
    }

    pub fn allows(self, state: State) -> bool {
        self.states().contains(&state)
    }

    /// Terminal states declared for this kind.
    pub fn terminal_states(self) -> Vec<State> {
        self.states()
            .iter()
            .copied()
            .filter(|state| state.is_terminal())
            .collect()
    }
}

impl State {
    /// Terminal states end a lifecycle: they never source a transition and
    /// free the identity for a later production.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Destroyed | State::Freed | State::Deregistered)
    }

    pub fn label(self) -> &'static str {
        match self {
            State::Allocated => "allocated",
            State::Imported => "imported",
            State::Bound => "bound",
            State::Listening => "listening",
            State::Connected => "connected",
            State::Used => "used",
            State::Reset => "reset",
            State::Init => "init",
            State::ReadyToReceive => "ready_to_receive",
            State::ReadyToSend => "ready_to_send",
            State::SendQueueDrained => "send_queue_drained",
            State::Error => "error",
            State::Registered => "registered",
            State::Deregistered => "deregistered",
            State::Destroyed => "destroyed",
            State::Freed => "freed",
        }
    }

    const ALL: [State; 16] = [
        State::Allocated,
        State::Imported,
        State::Bound,
        State::Listening,
        State::Connected,
        State::Used,
        State::Reset,
        State::Init,
        State::ReadyToReceive,
        State::ReadyToSend,
        State::SendQueueDrained,
        State::Error,
        State::Registered,
        State::Deregistered,
        State::Destroyed,
        State::Freed,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.label() == raw)
            .ok_or_else(|| format!("unknown resource kind '{raw}'"))
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|state| state.label() == raw)
            .ok_or_else(|| format!("unknown state '{raw}'"))
    }
}
