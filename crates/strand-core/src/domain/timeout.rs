//! How long a submitter waits for the worker to claim its item.

use std::time::Duration;

/// Claim timeout for a submission.
///
/// `Infinite` is the default: the submitter waits until the worker claims
/// the item. `After(d)` gives up after `d` and tries to cancel the item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeout {
    #[default]
    Infinite,
    After(Duration),
}

impl Timeout {
    /// Do not wait at all; cancel unless the worker already holds the item.
    pub const IMMEDIATE: Timeout = Timeout::After(Duration::ZERO);

    /// `None` means infinite.
    pub fn from_millis(millis: Option<u64>) -> Self {
        millis.map_or(Timeout::Infinite, |ms| {
            Timeout::After(Duration::from_millis(ms))
        })
    }

    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Timeout::Infinite => None,
            Timeout::After(duration) => Some(duration),
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Timeout::Infinite)
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_is_infinite() {
        assert!(Timeout::default().is_infinite());
        assert_eq!(Timeout::default().as_duration(), None);
    }

    #[rstest]
    #[case::none(None, Timeout::Infinite)]
    #[case::zero(Some(0), Timeout::IMMEDIATE)]
    #[case::some(Some(250), Timeout::After(Duration::from_millis(250)))]
    fn from_millis(#[case] millis: Option<u64>, #[case] expected: Timeout) {
        assert_eq!(Timeout::from_millis(millis), expected);
    }
}
