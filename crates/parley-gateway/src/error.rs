use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue;

use parley_api::ApiError;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("message is empty")]
    Empty,

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The connection loop is gone and will not write the frame.
    #[error("live connection closed")]
    Closed,

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

impl SendError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SendError::Api(e) if e.is_auth_failure())
    }
}

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),

    #[error("invalid credential header: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("cannot encode command: {0}")]
    Encode(#[from] serde_json::Error),
}
