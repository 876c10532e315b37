pub mod mqtt;

use serde::Serialize;
use std::fmt;

pub use mqtt::run_listener;

/// Feed connection state as seen by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Offline,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Offline => "Offline - Reconnecting...",
        };
        f.write_str(s)
    }
}

/// Events the transport delivers to the dashboard loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Payload(Vec<u8>),
    Status(ConnectionStatus),
}
