use serde::{Deserialize, Serialize};

/// Terminal result of delivering one unit (a single image or a media group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered,
    Failed { reason: FailureReason },
}

impl SendOutcome {
    #[must_use]
    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Why a unit was not delivered.
///
/// `Transport` means the request never produced a readable reply (connect,
/// TLS, timeout). `Rejected` means the remote side answered and refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    Transport {
        message: String,
    },
    Rejected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl FailureReason {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::Rejected {
                status,
                description,
            } => {
                write!(f, "rejected")?;
                if let Some(status) = status {
                    write!(f, " (HTTP {status})")?;
                }
                if let Some(description) = description {
                    write!(f, ": {description}")?;
                }
                Ok(())
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_includes_available_details() {
        let reason = FailureReason::Rejected {
            status: Some(400),
            description: Some("Bad Request: chat not found".into()),
        };
        assert_eq!(
            reason.to_string(),
            "rejected (HTTP 400): Bad Request: chat not found"
        );

        let bare = FailureReason::Rejected {
            status: None,
            description: None,
        };
        assert_eq!(bare.to_string(), "rejected");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = SendOutcome::failed(FailureReason::transport("connection refused"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["kind"], "transport");
        assert_eq!(json["reason"]["message"], "connection refused");

        let delivered = serde_json::to_value(SendOutcome::Delivered).unwrap();
        assert_eq!(delivered["status"], "delivered");
    }
}
