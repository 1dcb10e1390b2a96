use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PrevKeyMR of the first entry block of every chain
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Ledger confirmation state of a chain or entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Known locally, not yet seen by the ledger
    Queue,
    /// Acknowledged by the ledger, not yet in a directory block
    Processing,
    /// Anchored in a directory block
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queue => "queue",
            Status::Processing => "processing",
            Status::Completed => "completed",
        }
    }

    /// Merges a newly observed status into a stored one. `Completed` is final.
    pub fn merge(stored: Status, incoming: Status) -> Status {
        if stored == Status::Completed {
            Status::Completed
        } else {
            incoming
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue" => Ok(Status::Queue),
            "processing" => Ok(Status::Processing),
            "completed" => Ok(Status::Completed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_is_never_downgraded() {
        assert_eq!(
            Status::merge(Status::Completed, Status::Processing),
            Status::Completed
        );
        assert_eq!(
            Status::merge(Status::Queue, Status::Processing),
            Status::Processing
        );
        assert_eq!(
            Status::merge(Status::Processing, Status::Completed),
            Status::Completed
        );
    }

    #[test]
    fn test_status_strings() {
        for status in [Status::Queue, Status::Processing, Status::Completed] {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("done".parse::<Status>().is_err());
        assert_eq!(ZERO_HASH.len(), 64);
    }
}
