//! Point-in-time copy of the stream counters.

use std::fmt;

/// Values of [`StreamMetrics`](super::StreamMetrics) at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub requests_issued: u64,
    pub tiles_loaded: u64,
    pub fetch_failures: u64,
    pub completions_discarded: u64,
    pub tiles_evicted: u64,
    pub textures_registered: u64,
    pub textures_released: u64,
    pub fallback_draws: u64,
    pub budget_deferrals: u64,
    pub frames: u64,
}

impl StreamSnapshot {
    /// Textures registered and not yet released.
    pub fn textures_live(&self) -> u64 {
        self.textures_registered
            .saturating_sub(self.textures_released)
    }

    /// Fraction of finished fetches that failed, in `[0, 1]`.
    pub fn failure_rate(&self) -> f64 {
        let finished = self.tiles_loaded + self.fetch_failures;
        if finished == 0 {
            0.0
        } else {
            self.fetch_failures as f64 / finished as f64
        }
    }
}

impl fmt::Display for StreamSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frames:                {}", self.frames)?;
        writeln!(f, "Requests issued:       {}", self.requests_issued)?;
        writeln!(f, "Tiles loaded:          {}", self.tiles_loaded)?;
        writeln!(
            f,
            "Fetch failures:        {} ({:.1}%)",
            self.fetch_failures,
            self.failure_rate() * 100.0
        )?;
        writeln!(f, "Discarded completions: {}", self.completions_discarded)?;
        writeln!(f, "Tiles evicted:         {}", self.tiles_evicted)?;
        writeln!(
            f,
            "Textures:              {} registered, {} released, {} live",
            self.textures_registered,
            self.textures_released,
            self.textures_live()
        )?;
        writeln!(f, "Fallback draws:        {}", self.fallback_draws)?;
        write!(f, "Budget deferrals:      {}", self.budget_deferrals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let snapshot = StreamSnapshot {
            tiles_loaded: 3,
            fetch_failures: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.failure_rate(), 0.25);
        assert_eq!(StreamSnapshot::default().failure_rate(), 0.0);
    }

    #[test]
    fn test_display_lists_counters() {
        let snapshot = StreamSnapshot {
            frames: 12,
            textures_registered: 5,
            textures_released: 2,
            ..Default::default()
        };
        let text = snapshot.to_string();
        assert!(text.contains("Frames:                12"));
        assert!(text.contains("5 registered, 2 released, 3 live"));
    }
}
