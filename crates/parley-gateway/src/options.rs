use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How `send_message` reaches the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendRoute {
    /// POST to the relay endpoint on the live-transport host.
    #[default]
    Rest,
    /// A `send:message` frame on the live connection.
    Socket,
}

impl FromStr for SendRoute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(SendRoute::Rest),
            "socket" => Ok(SendRoute::Socket),
            other => Err(format!("unknown send route '{}', expected rest or socket", other)),
        }
    }
}

impl fmt::Display for SendRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SendRoute::Rest => "rest",
            SendRoute::Socket => "socket",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOptions {
    pub socket_url: String,
    pub send_route: SendRoute,
    pub send_timeout: Duration,
    /// Ping cadence. Two unanswered pings drop the connection.
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            socket_url: "ws://localhost:3001".into(),
            send_route: SendRoute::Rest,
            send_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
        }
    }
}

impl GatewayOptions {
    /// HTTP form of the socket URL, where the message relay lives.
    pub fn relay_base(&self) -> String {
        let url = self.socket_url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = url.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            url.to_string()
        }
    }
}
