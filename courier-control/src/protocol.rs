//! Control protocol types and serialization.

use courier_common::{campaign::DispatchSummary, job::JobSummary, quota::Admission};
use serde::{Deserialize, Serialize};

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request sent to the control server (versioned wrapper).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version.
    pub version: u32,
    /// The command to execute.
    pub command: Command,
}

impl Request {
    /// Create a request with the current protocol version.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command,
        }
    }

    #[must_use]
    pub const fn is_version_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

/// Engine commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Reserve send admission against the global quotas.
    Reserve { requested: u32 },
    /// Dispatch one campaign now, regardless of its schedule.
    Dispatch { campaign_id: String },
    /// Dispatch every due campaign.
    Tick,
    /// Claim and process at most one due bulk job.
    ProcessJob,
    /// Health check.
    Ping,
    /// Engine status and statistics.
    Status,
}

/// Response from the control server (versioned wrapper).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version.
    pub version: u32,
    /// The response payload.
    pub payload: ResponsePayload,
}

/// Response payload types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponsePayload {
    /// Command succeeded.
    Ok,
    /// Command succeeded with data.
    Data(Box<ResponseData>),
    /// Command failed with an error message.
    Error(String),
}

/// Response data types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseData {
    /// Result of a `Reserve` command.
    Admission(Admission),
    /// Result of a `Dispatch` command.
    Dispatch(DispatchSummary),
    /// Result of a `Tick` command: one summary per due campaign.
    Tick(Vec<DispatchSummary>),
    /// Result of a `ProcessJob` command; `None` when no job was due.
    Job(Option<JobSummary>),
    /// Engine status.
    Status(EngineStatus),
}

/// Engine status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Engine version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Whether quota limits are configured.
    pub limits_configured: bool,
    /// Number of configured transport providers.
    pub providers: usize,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Version:    {}", self.version)?;
        writeln!(f, "Uptime:     {}s", self.uptime_secs)?;
        writeln!(f, "Limits:     {}", if self.limits_configured { "configured" } else { "NOT CONFIGURED" })?;
        write!(f, "Providers:  {}", self.providers)
    }
}

impl Response {
    /// Create an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Error(message.into()),
        }
    }

    /// Create a success response with no data.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Ok,
        }
    }

    /// Create a response with data.
    #[must_use]
    pub fn data(data: ResponseData) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Data(Box::new(data)),
        }
    }

    /// Whether the response indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self.payload, ResponsePayload::Error(_))
    }

    #[must_use]
    pub const fn is_version_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use courier_common::campaign::CampaignStatus;

    use super::*;

    #[test]
    fn request_roundtrip() {
        for command in [
            Command::Reserve { requested: 25 },
            Command::Dispatch {
                campaign_id: "c1".to_string(),
            },
            Command::Tick,
            Command::ProcessJob,
            Command::Ping,
            Command::Status,
        ] {
            let request = Request::new(command);
            let encoded = serde_json::to_string(&request).unwrap();
            let decoded: Request = serde_json::from_str(&encoded).unwrap();
            assert!(decoded.is_version_compatible());
        }
    }

    #[test]
    fn response_roundtrip() {
        let response = Response::data(ResponseData::Dispatch(DispatchSummary {
            campaign_id: "c1".to_string(),
            status: CampaignStatus::Completed,
            sent: 50,
            failed: 0,
            deferred: 0,
        }));

        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: Response = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.is_success());

        match decoded.payload {
            ResponsePayload::Data(data) => match *data {
                ResponseData::Dispatch(summary) => {
                    assert_eq!(summary.campaign_id, "c1");
                    assert_eq!(summary.sent, 50);
                }
                other => panic!("unexpected data: {other:?}"),
            },
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn error_responses_are_not_success() {
        assert!(!Response::error("boom").is_success());
        assert!(Response::ok().is_success());
    }
}
