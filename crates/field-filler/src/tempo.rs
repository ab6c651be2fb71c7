//! Human-plausible pacing for fill actions.
//!
//! A fixed pre-action delay (slow-mo), per-character typing cadence with
//! random jitter, and a short settle after scrolling a control into view.

use std::time::Duration;

use rand::Rng;

const TEXT_CHAR_DELAY_MS: u64 = 50;
const TEXTAREA_CHAR_DELAY_MS: u64 = 30;

#[derive(Clone, Copy, Debug)]
pub struct Tempo {
    /// Delay before each fill action.
    pub slow_mo: Duration,
    /// Settle time after scrolling a control into view.
    pub scroll_settle: Duration,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            slow_mo: Duration::from_millis(500),
            scroll_settle: Duration::from_millis(200),
        }
    }
}

impl Tempo {
    pub fn with_slow_mo(slow_mo: Duration) -> Self {
        Self {
            slow_mo,
            ..Self::default()
        }
    }

    /// Per-character delay for single-line inputs, jittered.
    pub fn text_char_delay(&self) -> Duration {
        jittered(Duration::from_millis(TEXT_CHAR_DELAY_MS))
    }

    /// Per-character delay for textareas, jittered.
    pub fn textarea_char_delay(&self) -> Duration {
        jittered(Duration::from_millis(TEXTAREA_CHAR_DELAY_MS))
    }
}

/// Scale a base delay by a random factor in [0.7, 1.3).
fn jittered(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    let factor: f64 = rand::thread_rng().gen_range(0.7..1.3);
    base.mul_f64(factor)
}
