//! Sliding-window detection of sustained unsafe temperatures.

use crate::telemetry::signature::Signature;

/// Width of the incident window in milliseconds
pub const INCIDENT_WINDOW_MS: i64 = 5000;

/// Unsafe readings tolerated inside one window before an incident is raised
pub const MAX_UNSAFE_TEMPERATURES: usize = 3;

/// Whether the detector is currently inside a raised incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Quiet,
    Active,
}

/// A raised incident: the unsafe readings that made up the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub window: Vec<Signature>,
    pub window_ms: i64,
}

impl Incident {
    /// Text body written to the incidents log.
    pub fn details(&self) -> String {
        let mut text = format!(
            "Temperatures Exceeded {} Times in {}ms:",
            self.window.len(),
            self.window_ms
        );
        for signature in &self.window {
            text.push_str(&format!(
                "\nTimestamp: {}, Temperature: {:.3}",
                signature.iso_timestamp(),
                signature.temperature
            ));
        }
        text
    }
}

/// Decides when a run of unsafe readings becomes an incident.
///
/// The window is recomputed from the full history on every evaluation, so
/// stale entries only age out when the next unsafe reading arrives. A window
/// identical to the last raised one is not reported again.
#[derive(Debug)]
pub struct IncidentDetector {
    window_ms: i64,
    max_unsafe: usize,
    state: DetectorState,
    last_raised: Option<Vec<Signature>>,
}

impl Default for IncidentDetector {
    fn default() -> Self {
        Self::new(INCIDENT_WINDOW_MS, MAX_UNSAFE_TEMPERATURES)
    }
}

impl IncidentDetector {
    pub fn new(window_ms: i64, max_unsafe: usize) -> Self {
        Self {
            window_ms,
            max_unsafe,
            state: DetectorState::Quiet,
            last_raised: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Unsafe readings whose timestamp is at most `window_ms` before `now_ms`.
    ///
    /// Producer timestamps are untrusted; the age saturates instead of
    /// overflowing.
    pub fn window(&self, history: &[Signature], now_ms: i64) -> Vec<Signature> {
        history
            .iter()
            .filter(|s| !s.is_safe && now_ms.saturating_sub(s.timestamp) <= self.window_ms)
            .cloned()
            .collect()
    }

    /// Evaluate the window after an unsafe reading was appended.
    ///
    /// Returns the incident to report, or `None` when the window is under the
    /// threshold or unchanged since the last report.
    pub fn evaluate(&mut self, history: &[Signature], now_ms: i64) -> Option<Incident> {
        let window = self.window(history, now_ms);

        if window.len() <= self.max_unsafe {
            self.state = DetectorState::Quiet;
            return None;
        }

        self.state = DetectorState::Active;
        if self.last_raised.as_ref() == Some(&window) {
            return None;
        }

        self.last_raised = Some(window.clone());
        Some(Incident {
            window,
            window_ms: self.window_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_693_741_005_254;

    fn unsafe_run(count: usize, start: i64) -> Vec<Signature> {
        (0..count)
            .map(|i| Signature::new(10.0, start + i as i64 * 100))
            .collect()
    }

    #[test]
    fn test_threshold_not_exceeded() {
        let mut detector = IncidentDetector::default();
        let history = unsafe_run(MAX_UNSAFE_TEMPERATURES, NOW - 500);
        assert!(detector.evaluate(&history, NOW).is_none());
        assert_eq!(detector.state(), DetectorState::Quiet);
    }

    #[test]
    fn test_incident_raised_once_for_identical_window() {
        let mut detector = IncidentDetector::default();
        let history = unsafe_run(MAX_UNSAFE_TEMPERATURES + 1, NOW - 500);

        let incident = detector.evaluate(&history, NOW).expect("incident");
        assert_eq!(incident.window.len(), 4);
        assert_eq!(detector.state(), DetectorState::Active);

        assert!(detector.evaluate(&history, NOW).is_none());
        assert_eq!(detector.state(), DetectorState::Active);
    }

    #[test]
    fn test_new_entry_changes_window_and_renotifies() {
        let mut detector = IncidentDetector::default();
        let mut history = unsafe_run(4, NOW - 500);
        assert!(detector.evaluate(&history, NOW).is_some());

        history.push(Signature::new(95.0, NOW));
        let incident = detector.evaluate(&history, NOW).expect("changed window");
        assert_eq!(incident.window.len(), 5);
    }

    #[test]
    fn test_safe_and_stale_readings_excluded() {
        let detector = IncidentDetector::default();
        let history = vec![
            Signature::new(10.0, NOW - INCIDENT_WINDOW_MS - 1),
            Signature::new(10.0, NOW - INCIDENT_WINDOW_MS),
            Signature::new(50.0, NOW - 10),
            Signature::new(85.0, NOW),
        ];

        let window = detector.window(&history, NOW);
        let timestamps: Vec<i64> = window.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![NOW - INCIDENT_WINDOW_MS, NOW]);
    }

    #[test]
    fn test_window_shrinking_returns_to_quiet() {
        let mut detector = IncidentDetector::default();
        let history = unsafe_run(4, NOW - 500);
        assert!(detector.evaluate(&history, NOW).is_some());

        let later = NOW + INCIDENT_WINDOW_MS;
        assert!(detector.evaluate(&history, later).is_none());
        assert_eq!(detector.state(), DetectorState::Quiet);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut detector = IncidentDetector::default();
        let ancient = vec![Signature::new(10.0, i64::MIN); 4];
        assert!(detector.window(&ancient, NOW).is_empty());
        assert!(detector.evaluate(&ancient, NOW).is_none());

        // far-future readings count as inside the window
        let future = vec![Signature::new(10.0, i64::MAX); 4];
        let incident = detector.evaluate(&future, NOW).expect("future-dated window");
        assert_eq!(incident.window.len(), 4);

        // the same window seen from the lowest possible clock is unchanged
        assert!(detector.evaluate(&future, i64::MIN).is_none());
        assert_eq!(detector.state(), DetectorState::Active);
    }

    #[test]
    fn test_incident_details_format() {
        let incident = Incident {
            window: vec![
                Signature::new(10.0, 1693741005254),
                Signature::new(85.12345, 1693741005354),
            ],
            window_ms: INCIDENT_WINDOW_MS,
        };

        assert_eq!(
            incident.details(),
            "Temperatures Exceeded 2 Times in 5000ms:\n\
             Timestamp: 2023-09-03T11:36:45.254Z, Temperature: 10.000\n\
             Timestamp: 2023-09-03T11:36:45.354Z, Temperature: 85.123"
        );
    }
}
