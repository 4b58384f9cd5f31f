// Nag Windows - expiration horizons the mailer walks through

use chrono::{DateTime, Duration, Utc};

/// Certificates expiring in `(start, end]` that were not nagged for `horizon` yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub horizon: Duration,
}

impl ExpiryWindow {
    /// Consecutive, non-overlapping windows for the given horizons.
    ///
    /// Horizons are sorted and deduplicated; the first window starts at `now`.
    pub fn series(now: DateTime<Utc>, horizons: &[Duration]) -> Vec<ExpiryWindow> {
        let mut sorted: Vec<Duration> = horizons
            .iter()
            .copied()
            .filter(|h| *h > Duration::zero())
            .collect();
        sorted.sort();
        sorted.dedup();

        let mut windows = Vec::with_capacity(sorted.len());
        let mut start = now;
        for horizon in sorted {
            let end = now + horizon;
            windows.push(ExpiryWindow {
                start,
                end,
                horizon,
            });
            start = end;
        }
        windows
    }

    pub fn contains(&self, expires: DateTime<Utc>) -> bool {
        expires > self.start && expires <= self.end
    }

    /// Whether a certificate still owes a notice for this window.
    ///
    /// A nag sent after `expires - horizon` already covered this window.
    pub fn needs_nag(&self, expires: DateTime<Utc>, last_nag: Option<DateTime<Utc>>) -> bool {
        match last_nag {
            None => true,
            Some(sent) => sent < expires - self.horizon,
        }
    }

    /// Both the range check and the nag bookkeeping
    pub fn is_due(&self, expires: DateTime<Utc>, last_nag: Option<DateTime<Utc>>) -> bool {
        self.contains(expires) && self.needs_nag(expires, last_nag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_series_is_sorted_and_contiguous() {
        let windows = ExpiryWindow::series(
            now(),
            &[Duration::days(7), Duration::days(1), Duration::days(7)],
        );

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, now());
        assert_eq!(windows[0].end, now() + Duration::days(1));
        assert_eq!(windows[1].start, windows[0].end);
        assert_eq!(windows[1].end, now() + Duration::days(7));
    }

    #[test]
    fn test_zero_horizon_is_ignored() {
        assert!(ExpiryWindow::series(now(), &[Duration::zero()]).is_empty());
    }

    #[test]
    fn test_contains_is_half_open() {
        let window = ExpiryWindow::series(now(), &[Duration::days(1)])[0];
        assert!(!window.contains(now()));
        assert!(window.contains(now() + Duration::hours(1)));
        assert!(window.contains(now() + Duration::days(1)));
        assert!(!window.contains(now() + Duration::days(1) + Duration::seconds(1)));
    }

    #[test]
    fn test_needs_nag() {
        let window = ExpiryWindow::series(now(), &[Duration::days(3)])[0];
        let expires = now() + Duration::days(2);

        assert!(window.needs_nag(expires, None));
        // nagged long before this window opened
        assert!(window.needs_nag(expires, Some(now() - Duration::days(20))));
        // nagged inside the window already
        assert!(!window.needs_nag(expires, Some(now())));
    }
}
