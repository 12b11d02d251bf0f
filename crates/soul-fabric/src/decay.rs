//! Two-phase decay model: visualizer consumers derive a facet's current
//! activation weight from how long ago the last pulse touching it arrived.

use std::time::Duration;

/// Phase 1: full activation for this long after a pulse.
pub const PHASE_ONE: Duration = Duration::from_secs(6);
/// Phase 2: linear afterglow for this long after phase one ends.
pub const PHASE_TWO: Duration = Duration::from_secs(15);
/// A node is "working" if any pulse arrived within this window.
pub const WORKING_WINDOW: Duration = Duration::from_secs(20);

/// Activation weight in `[0.0, 1.0]` for a facet touched `elapsed` ago.
/// `elapsed` beyond `PHASE_ONE + PHASE_TWO` is fully decayed (0.0).
pub fn weight(elapsed: Duration) -> f64 {
    if elapsed <= PHASE_ONE {
        1.0
    } else if elapsed <= PHASE_ONE + PHASE_TWO {
        let into_phase_two = (elapsed - PHASE_ONE).as_secs_f64();
        let total = PHASE_TWO.as_secs_f64();
        (0.5 * (1.0 - into_phase_two / total)).max(0.0)
    } else {
        0.0
    }
}

pub fn is_working(elapsed: Duration) -> bool {
    elapsed <= WORKING_WINDOW
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_activation_within_phase_one() {
        assert_eq!(weight(Duration::from_secs(0)), 1.0);
        assert_eq!(weight(Duration::from_secs(6)), 1.0);
    }

    #[test]
    fn afterglow_decays_linearly_in_phase_two() {
        let w = weight(Duration::from_secs(10));
        assert!((w - 0.3667).abs() < 0.01, "got {w}");
    }

    #[test]
    fn fully_decayed_after_phase_two() {
        assert_eq!(weight(Duration::from_secs(22)), 0.0);
    }

    #[test]
    fn working_flag_matches_twenty_second_window() {
        assert!(is_working(Duration::from_secs(19)));
        assert!(is_working(Duration::from_secs(20)));
        assert!(!is_working(Duration::from_secs(21)));
    }
}
