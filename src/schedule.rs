//! Randomized-but-bounded scheduling: jittered delayed activations and
//! precomputed burst windows. All randomness flows through the caller's
//! `fastrand::Rng` so schedules are reproducible under a seed.

use crate::definition::BurstParams;
use crate::effects::EffectId;

/// Scheduling magnitudes. Defaults match the shipped behavior; tests and
/// unusual hosts may override them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Half-width of the uniform jitter applied to delayed starts, minutes.
    pub jitter_min: f32,
    /// Window for the first burst offset, minutes.
    pub first_burst_min: f32,
    pub first_burst_max: f32,
    /// Window for each burst's active duration, minutes.
    pub burst_len_min: f32,
    pub burst_len_max: f32,
    /// No burst may be scheduled closer than this to the session end.
    pub tail_guard_min: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            jitter_min: 3.0,
            first_burst_min: 2.0,
            first_burst_max: 5.0,
            burst_len_min: 1.0,
            burst_len_max: 2.0,
            tail_guard_min: 2.0,
        }
    }
}

pub(crate) fn uniform(rng: &mut fastrand::Rng, lo: f32, hi: f32) -> f32 {
    lo + (hi - lo) * rng.f32()
}

/// Jittered activation instant for a delayed feature. Drawn once at session
/// start; a `start_min` of 0 activates immediately and gets no jitter.
pub fn jittered_activation(rng: &mut fastrand::Rng, start_min: f32, tuning: &Tuning) -> f32 {
    if start_min <= 0.0 {
        return 0.0;
    }
    let jitter = uniform(rng, -tuning.jitter_min, tuning.jitter_min);
    (start_min + jitter).max(0.0)
}

/// Sorted burst trigger times for one session. Generation walks forward from
/// a random first offset and stops once the requested count exists or the
/// next candidate would land inside the tail guard.
pub fn burst_times(
    rng: &mut fastrand::Rng,
    params: &BurstParams,
    duration_min: f32,
    tuning: &Tuning,
) -> Vec<f32> {
    let mut times = Vec::new();
    if !params.enabled || params.burst_count == 0 {
        return times;
    }
    let cutoff = duration_min - tuning.tail_guard_min;
    let mut t = uniform(rng, tuning.first_burst_min, tuning.first_burst_max);
    while times.len() < params.burst_count as usize && t < cutoff {
        times.push(t);
        t += uniform(rng, params.min_gap_min, params.max_gap_min);
    }
    times
}

/// One delayed-start feature with its fixed activation instant. `skipped`
/// marks a feature whose resources were missing when it came due; it counts
/// as fired (never retried) but never as active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayedFeature {
    pub effect: EffectId,
    pub target_min: f32,
    pub activation_min: f32,
    pub fired: bool,
    pub skipped: bool,
}

impl DelayedFeature {
    pub fn new(effect: EffectId, target_min: f32, activation_min: f32) -> Self {
        Self {
            effect,
            target_min,
            activation_min,
            fired: false,
            skipped: false,
        }
    }
}

/// Signal emitted by the burst runtime on a state edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstSignal {
    Begin { magnitude: u8 },
    End,
}

/// Tick-evaluated cursor over a precomputed burst time list. At most one
/// burst is active at a time; an overdue trigger waits until the current
/// window has closed.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstRuntime {
    times: Vec<f32>,
    cursor: usize,
    active_until: Option<f32>,
    magnitude: u8,
}

impl BurstRuntime {
    pub fn new(times: Vec<f32>, magnitude: u8) -> Self {
        Self {
            times,
            cursor: 0,
            active_until: None,
            magnitude,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_until.is_some()
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Advance to `elapsed_min`; returns at most one edge per tick.
    pub fn tick(
        &mut self,
        elapsed_min: f32,
        rng: &mut fastrand::Rng,
        tuning: &Tuning,
    ) -> Option<BurstSignal> {
        if let Some(end) = self.active_until {
            if elapsed_min >= end {
                self.active_until = None;
                return Some(BurstSignal::End);
            }
            return None;
        }
        if self.cursor < self.times.len() && elapsed_min >= self.times[self.cursor] {
            self.cursor += 1;
            let len = uniform(rng, tuning.burst_len_min, tuning.burst_len_max);
            self.active_until = Some(elapsed_min + len);
            return Some(BurstSignal::Begin {
                magnitude: self.magnitude,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst_params(count: u32, min_gap: f32, max_gap: f32) -> BurstParams {
        BurstParams {
            enabled: true,
            burst_count: count,
            magnitude: 40,
            min_gap_min: min_gap,
            max_gap_min: max_gap,
        }
    }

    #[test]
    fn jitter_stays_within_half_width() {
        let tuning = Tuning::default();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let t = jittered_activation(&mut rng, 10.0, &tuning);
            assert!((7.0..=13.0).contains(&t), "activation {t} outside window");
        }
    }

    #[test]
    fn jitter_clamps_to_zero_for_early_starts() {
        let tuning = Tuning::default();
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let t = jittered_activation(&mut rng, 1.0, &tuning);
            assert!(t >= 0.0);
        }
        assert_eq!(jittered_activation(&mut rng, 0.0, &tuning), 0.0);
    }

    #[test]
    fn burst_times_respect_bounds_and_gaps() {
        let tuning = Tuning::default();
        let params = burst_params(8, 3.0, 6.0);
        for seed in 0..50 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let times = burst_times(&mut rng, &params, 30.0, &tuning);
            assert!(times.len() <= 8);
            for t in &times {
                assert!((0.0..28.0).contains(t), "burst time {t} out of range");
            }
            for pair in times.windows(2) {
                assert!(pair[1] - pair[0] >= 3.0 - 1e-5);
            }
        }
    }

    #[test]
    fn burst_times_empty_when_disabled_or_short() {
        let tuning = Tuning::default();
        let mut rng = fastrand::Rng::with_seed(3);
        let mut params = burst_params(5, 3.0, 6.0);
        params.enabled = false;
        assert!(burst_times(&mut rng, &params, 30.0, &tuning).is_empty());

        let params = burst_params(5, 3.0, 6.0);
        // Session too short for even the first offset to clear the tail guard.
        assert!(burst_times(&mut rng, &params, 4.0, &tuning).is_empty());
    }

    #[test]
    fn burst_runtime_windows_never_overlap() {
        let tuning = Tuning::default();
        let mut rng = fastrand::Rng::with_seed(11);
        let mut runtime = BurstRuntime::new(vec![2.0, 2.5, 9.0], 40);

        let mut active = false;
        let mut begins = 0;
        let mut t = 0.0;
        while t < 20.0 {
            match runtime.tick(t, &mut rng, &tuning) {
                Some(BurstSignal::Begin { magnitude }) => {
                    assert!(!active, "burst began while another was active");
                    assert_eq!(magnitude, 40);
                    active = true;
                    begins += 1;
                }
                Some(BurstSignal::End) => {
                    assert!(active, "burst ended while idle");
                    active = false;
                }
                None => {}
            }
            t += 0.25;
        }
        assert_eq!(begins, 3);
    }

    #[test]
    fn overdue_burst_waits_for_open_window() {
        let tuning = Tuning::default();
        let mut rng = fastrand::Rng::with_seed(5);
        let mut runtime = BurstRuntime::new(vec![2.0, 2.1], 30);

        assert!(matches!(
            runtime.tick(2.0, &mut rng, &tuning),
            Some(BurstSignal::Begin { .. })
        ));
        // Second trigger is already due but the window is still open.
        assert_eq!(runtime.tick(2.5, &mut rng, &tuning), None);
        // Window closes (bursts last at most 2 minutes)...
        let mut t = 2.5;
        loop {
            t += 0.25;
            if let Some(signal) = runtime.tick(t, &mut rng, &tuning) {
                assert_eq!(signal, BurstSignal::End);
                break;
            }
            assert!(t < 5.0, "burst never ended");
        }
        // ...and the overdue trigger fires on the next eligible tick.
        assert!(matches!(
            runtime.tick(t + 0.25, &mut rng, &tuning),
            Some(BurstSignal::Begin { .. })
        ));
    }
}
