use std::fmt;
use std::time::Duration;

use super::api::{Command, Endpoint};

/// Why a single remote call failed.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiError {
    /// Connection, TLS or protocol failure before a response arrived.
    Transport { endpoint: Endpoint, message: String },
    /// No response within the per-request deadline.
    Timeout { endpoint: Endpoint, after: Duration },
    /// The service answered with a non-success status.
    Rejected { endpoint: Endpoint, status: u16, detail: String },
    /// The body did not match the expected shape.
    Decode { endpoint: Endpoint, message: String },
    /// The body decoded but breaks a data invariant.
    Invalid { endpoint: Endpoint, message: String },
}

impl ApiError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApiError::Transport { endpoint, .. }
            | ApiError::Timeout { endpoint, .. }
            | ApiError::Rejected { endpoint, .. }
            | ApiError::Decode { endpoint, .. }
            | ApiError::Invalid { endpoint, .. } => *endpoint,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport { endpoint, message } => {
                write!(f, "request to {} failed: {}", endpoint, message)
            }
            ApiError::Timeout { endpoint, after } => {
                write!(f, "{} did not answer within {}ms", endpoint, after.as_millis())
            }
            ApiError::Rejected { endpoint, status, detail } => {
                write!(f, "{} returned {}: {}", endpoint, status, detail)
            }
            ApiError::Decode { endpoint, message } => {
                write!(f, "malformed payload from {}: {}", endpoint, message)
            }
            ApiError::Invalid { endpoint, message } => {
                write!(f, "invalid data from {}: {}", endpoint, message)
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Operator-facing action an error is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Refresh,
    Start,
    Stop,
    TestNotification,
}

impl Operation {
    pub fn class(&self) -> ErrorClass {
        match self {
            Operation::Refresh => ErrorClass::Fetch,
            Operation::Start | Operation::Stop | Operation::TestNotification => ErrorClass::Command,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Operation::Refresh => "Failed to fetch data",
            Operation::Start => "Failed to start bot",
            Operation::Stop => "Failed to stop bot",
            Operation::TestNotification => "Failed to send test notification",
        }
    }
}

impl From<Command> for Operation {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => Operation::Start,
            Command::Stop => Operation::Stop,
            Command::TestNotification => Operation::TestNotification,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Fetch,
    Command,
}

/// A failed dashboard operation, tagged with the action that failed.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncError {
    operation: Operation,
    cause: ApiError,
    reconcile: Option<ApiError>,
}

impl SyncError {
    pub fn new(operation: Operation, cause: ApiError) -> Self {
        Self {
            operation,
            cause,
            reconcile: None,
        }
    }

    /// Attaches the failure of the refresh that followed a failed command.
    pub fn with_reconcile_failure(mut self, cause: ApiError) -> Self {
        self.reconcile = Some(cause);
        self
    }

    /// Why the refresh after this command failed too, if it did.
    pub fn reconcile_failure(&self) -> Option<&ApiError> {
        self.reconcile.as_ref()
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn class(&self) -> ErrorClass {
        self.operation.class()
    }

    pub fn cause(&self) -> &ApiError {
        &self.cause
    }

    /// Short message suitable for the error banner.
    pub fn headline(&self) -> &'static str {
        self.operation.headline()
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.headline(), self.cause)?;
        if let Some(reconcile) = &self.reconcile {
            write!(f, " (refresh afterwards also failed: {})", reconcile)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failures_are_phrased_per_action() {
        let cause = ApiError::Rejected {
            endpoint: Endpoint::Start,
            status: 400,
            detail: "Wallet private key not configured".into(),
        };
        let err = SyncError::new(Command::Start.into(), cause);
        assert_eq!(err.class(), ErrorClass::Command);
        assert_eq!(
            err.to_string(),
            "Failed to start bot: /api/start returned 400: Wallet private key not configured"
        );
        assert_eq!(SyncError::new(Operation::Stop, err.cause().clone()).headline(), "Failed to stop bot");
    }

    #[test]
    fn reconcile_failure_rides_along_with_command_error() {
        let err = SyncError::new(
            Operation::Stop,
            ApiError::Rejected { endpoint: Endpoint::Stop, status: 500, detail: "boom".into() },
        )
        .with_reconcile_failure(ApiError::Transport {
            endpoint: Endpoint::Status,
            message: "connection refused".into(),
        });
        assert_eq!(err.class(), ErrorClass::Command);
        assert_eq!(err.headline(), "Failed to stop bot");
        assert_eq!(err.reconcile_failure().map(ApiError::endpoint), Some(Endpoint::Status));
        assert_eq!(
            err.to_string(),
            "Failed to stop bot: /api/stop returned 500: boom \
             (refresh afterwards also failed: request to /api/status failed: connection refused)"
        );
    }

    #[test]
    fn refresh_failures_are_fetch_class() {
        let err = SyncError::new(
            Operation::Refresh,
            ApiError::Timeout { endpoint: Endpoint::Price, after: Duration::from_secs(5) },
        );
        assert_eq!(err.class(), ErrorClass::Fetch);
        assert_eq!(err.to_string(), "Failed to fetch data: /api/price did not answer within 5000ms");
        assert_eq!(err.cause().endpoint(), Endpoint::Price);
    }
}
