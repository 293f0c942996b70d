//! Rolling aggregate state for one player or team
//!
//! Accumulated match-by-match in date order; every derived value reflects
//! only the matches already folded in, so reading features before updating
//! with the current match gives as-of semantics for free.

use crate::FeatureConfig;
use std::collections::VecDeque;

/// Rolling totals and recent-match history for a single entity
#[derive(Debug, Clone, Default)]
pub struct Rolling {
    /// Career runs (off the bat)
    pub runs: i64,
    /// Balls faced
    pub balls_faced: i64,
    /// Times dismissed (players) or wickets lost (teams)
    pub dismissals: i64,
    pub wins: usize,
    pub losses: usize,
    /// Matches folded in so far
    pub matches: usize,
    /// Per-match run totals, oldest first, capped at the long momentum window
    recent: VecDeque<f64>,
    /// Running range of raw momentum diffs seen so far, for min-max scaling
    diff_lo: f64,
    diff_hi: f64,
    diff_seen: usize,
}

impl Rolling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_history(&self) -> bool {
        self.matches > 0
    }

    /// `100 * runs / balls_faced`, 0 when no balls faced
    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            0.0
        } else {
            100.0 * self.runs as f64 / self.balls_faced as f64
        }
    }

    /// `runs / max(dismissals, 1)`
    pub fn batting_average(&self) -> f64 {
        self.runs as f64 / (self.dismissals.max(1)) as f64
    }

    /// `wins / max(wins + losses, 1)`
    pub fn win_ratio(&self) -> f64 {
        let played = self.wins + self.losses;
        self.wins as f64 / played.max(1) as f64
    }

    /// Exponentially-weighted average of the last `form_window` per-match run
    /// totals, weight halving (by `form_decay`) each match back
    pub fn form_index(&self, config: &FeatureConfig) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        let mut weight = 1.0;
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for total in self.recent.iter().rev().take(config.form_window) {
            weighted_sum += weight * total;
            weight_sum += weight;
            weight *= config.form_decay;
        }
        weighted_sum / weight_sum
    }

    fn window_mean(&self, window: usize) -> f64 {
        let n = self.recent.len().min(window);
        if n == 0 {
            return 0.0;
        }
        self.recent.iter().rev().take(n).sum::<f64>() / n as f64
    }

    /// Short-window minus long-window mean form, min-max scaled to [0, 1]
    /// against the spread of diffs this entity has produced so far. The
    /// scaling uses only past observations, so the value never depends on
    /// future matches. 0.0 with no history, 0.5 before any spread exists.
    pub fn momentum_score(&self, config: &FeatureConfig) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        let diff = self.raw_momentum(config);
        if self.diff_seen == 0 || self.diff_hi <= self.diff_lo {
            return 0.5;
        }
        ((diff - self.diff_lo) / (self.diff_hi - self.diff_lo)).clamp(0.0, 1.0)
    }

    fn raw_momentum(&self, config: &FeatureConfig) -> f64 {
        self.window_mean(config.momentum_short) - self.window_mean(config.momentum_long)
    }

    /// Fold in one completed match. Call only after all feature reads for
    /// that match are done.
    pub fn update(
        &mut self,
        config: &FeatureConfig,
        match_runs: i64,
        balls: i64,
        dismissals: i64,
        won: Option<bool>,
    ) {
        // Register the pre-update momentum diff in the running range
        if !self.recent.is_empty() {
            let diff = self.raw_momentum(config);
            if self.diff_seen == 0 {
                self.diff_lo = diff;
                self.diff_hi = diff;
            } else {
                self.diff_lo = self.diff_lo.min(diff);
                self.diff_hi = self.diff_hi.max(diff);
            }
            self.diff_seen += 1;
        }

        self.runs += match_runs;
        self.balls_faced += balls;
        self.dismissals += dismissals;
        match won {
            Some(true) => self.wins += 1,
            Some(false) => self.losses += 1,
            None => {}
        }
        self.matches += 1;

        let cap = config.momentum_long.max(config.form_window);
        self.recent.push_back(match_runs as f64);
        while self.recent.len() > cap {
            self.recent.pop_front();
        }
    }
}
