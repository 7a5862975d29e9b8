use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime};

/// Seconds since the Unix epoch, as recorded on a [`Submission`](crate::broadcast::Submission).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(u64);

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UnixTimestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The current time. A clock set before the epoch reads as the epoch.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(since_epoch.as_secs())
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        let ts = UnixTimestamp::from_secs(1_699_999_999);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1699999999");
        let parsed: UnixTimestamp = serde_json::from_str("1699999999").unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_now_is_monotonic_enough() {
        let before = UnixTimestamp::from_secs(1_600_000_000);
        let now = UnixTimestamp::now();
        assert!(now > before);
        assert!(now.as_secs() > before.as_secs());
    }
}
