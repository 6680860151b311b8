use serde::{Deserialize, Serialize};

/// State of one probed TCP port. The wire spelling is `"open"`/`"close"`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "close")]
    Closed,
}

/// Outcome of a single probe against one port of the scanned host.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortOutcome {
    pub port: u16,
    pub state: PortState,
}

impl PortOutcome {
    pub fn open(port: u16) -> Self {
        Self {
            port,
            state: PortState::Open,
        }
    }

    pub fn closed(port: u16) -> Self {
        Self {
            port,
            state: PortState::Closed,
        }
    }
}
