use parley_api::ApiError;
use parley_gateway::SendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Moderation,
}

/// A transient message shown after a failed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn from_api_error(err: &ApiError) -> Self {
        match err {
            ApiError::Moderation {
                message,
                toxicity_score,
            } => Notice {
                kind: NoticeKind::Moderation,
                title: message.clone(),
                description: toxicity_score.map(toxicity_label),
            },
            ApiError::Rejected { message, .. } => Notice::error(message.clone()),
            other => Notice::error(other.to_string()),
        }
    }

    pub fn from_send_error(err: &SendError) -> Self {
        match err {
            SendError::Api(api) => Self::from_api_error(api),
            SendError::Empty => Notice::error("Message is empty"),
            SendError::Closed | SendError::Timeout(_) => Notice::error("Failed to send message"),
        }
    }

    fn error(title: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            title: title.into(),
            description: None,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", self.title, description),
            None => f.write_str(&self.title),
        }
    }
}

/// `0.92` becomes `"Toxicity score: 92.0%"`.
pub fn toxicity_label(score: f64) -> String {
    format!("Toxicity score: {:.1}%", score * 100.0)
}
