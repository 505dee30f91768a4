use crate::snapshot::Summary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// Merging never lowers the accumulated status.
    pub fn escalate(self, other: Status) -> Status {
        self.max(other)
    }

    pub fn worst<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().fold(Status::Ok, Status::escalate)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn summary_status(summary: &Summary) -> Status {
    if summary.expired > 0 {
        Status::Critical
    } else if summary.warning > 0 {
        Status::Warning
    } else {
        Status::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub warning_after: Duration,
    pub critical_after: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            warning_after: Duration::from_secs(30 * 3600),
            critical_after: Duration::from_secs(50 * 3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    pub status: Status,
    pub age: Option<Duration>,
    pub message: Option<String>,
}

pub const MISSING_TIMESTAMP: &str = "missing timestamp";

pub fn freshness(
    now: DateTime<Utc>,
    last_check: Option<DateTime<Utc>>,
    policy: &FreshnessPolicy,
) -> Freshness {
    let Some(last_check) = last_check else {
        return Freshness {
            status: Status::Critical,
            age: None,
            message: Some(MISSING_TIMESTAMP.to_string()),
        };
    };

    // A timestamp from the future counts as zero age.
    let age = (now - last_check).to_std().unwrap_or(Duration::ZERO);
    let status = if age > policy.critical_after {
        Status::Critical
    } else if age > policy.warning_after {
        Status::Warning
    } else {
        Status::Ok
    };
    let message = (status != Status::Ok).then(|| {
        format!(
            "last check {} ago (older than {})",
            format_age(age),
            format_age(if status == Status::Critical {
                policy.critical_after
            } else {
                policy.warning_after
            })
        )
    });

    Freshness {
        status,
        age: Some(age),
        message,
    }
}

pub fn format_age(age: Duration) -> String {
    humantime::format_duration(Duration::from_secs(age.as_secs())).to_string()
}
