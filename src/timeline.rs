use crate::definition::Phase;

/// Linear ramp of a parameter value across a minute window.
///
/// Before `start_min` the value is pinned to `start_value`; at and after
/// `end_min` it is exactly `end_value`. In between the value is the plain
/// linear interpolation of the two endpoints.
pub fn ramp(
    elapsed_min: f32,
    start_min: f32,
    end_min: f32,
    start_value: f32,
    end_value: f32,
) -> f32 {
    let span = end_min - start_min;
    if span <= 0.0 {
        return if elapsed_min >= end_min {
            end_value
        } else {
            start_value
        };
    }
    let t = (elapsed_min - start_min) / span;
    if t <= 0.0 {
        start_value
    } else if t >= 1.0 {
        end_value
    } else {
        start_value + (end_value - start_value) * t
    }
}

/// Index of the phase active at `elapsed_min`: the greatest index whose
/// `start_min` is not past the elapsed time. Falls back to 0 when the table
/// starts later than the elapsed time (the first phase is expected at 0).
pub fn resolve_phase(phases: &[Phase], elapsed_min: f32) -> usize {
    let mut active = 0;
    for (idx, phase) in phases.iter().enumerate() {
        if phase.start_min <= elapsed_min {
            active = idx;
        } else {
            break;
        }
    }
    active
}

/// Round a ramped value into the 0-100 percent domain effects consume.
pub fn round_percent(value: f32) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Round a ramped value into a whole events-per-hour rate.
pub fn round_per_hour(value: f32) -> u32 {
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases(starts: &[f32]) -> Vec<Phase> {
        starts
            .iter()
            .enumerate()
            .map(|(i, &start_min)| Phase {
                start_min,
                name: format!("phase{i}"),
                description: String::new(),
            })
            .collect()
    }

    #[test]
    fn ramp_pins_endpoints_exactly() {
        assert_eq!(ramp(0.0, 10.0, 30.0, 0.0, 15.0), 0.0);
        assert_eq!(ramp(10.0, 10.0, 30.0, 0.0, 15.0), 0.0);
        assert_eq!(ramp(30.0, 10.0, 30.0, 0.0, 15.0), 15.0);
        assert_eq!(ramp(45.0, 10.0, 30.0, 0.0, 15.0), 15.0);
    }

    #[test]
    fn ramp_is_monotonic_between_endpoints() {
        let mut prev = ramp(10.0, 10.0, 30.0, 0.0, 15.0);
        let mut t = 10.0;
        while t <= 30.0 {
            let v = ramp(t, 10.0, 30.0, 0.0, 15.0);
            assert!(v >= prev, "ramp decreased at t={t}: {v} < {prev}");
            prev = v;
            t += 0.25;
        }

        // Descending ramps are monotonic the other way.
        let mut prev = ramp(0.0, 0.0, 20.0, 80.0, 20.0);
        let mut t = 0.0;
        while t <= 20.0 {
            let v = ramp(t, 0.0, 20.0, 80.0, 20.0);
            assert!(v <= prev, "ramp increased at t={t}: {v} > {prev}");
            prev = v;
            t += 0.25;
        }
    }

    #[test]
    fn ramp_midpoint_is_linear() {
        let mid = ramp(20.0, 10.0, 30.0, 0.0, 15.0);
        assert!((mid - 7.5).abs() < 1e-5);
        let rounded = round_percent(mid);
        assert!(rounded == 7 || rounded == 8);
    }

    #[test]
    fn resolve_phase_picks_greatest_started_index() {
        let table = phases(&[0.0, 10.0, 22.0]);
        assert_eq!(resolve_phase(&table, 0.0), 0);
        assert_eq!(resolve_phase(&table, 9.9), 0);
        assert_eq!(resolve_phase(&table, 10.0), 1);
        assert_eq!(resolve_phase(&table, 21.9), 1);
        assert_eq!(resolve_phase(&table, 22.0), 2);
        assert_eq!(resolve_phase(&table, 500.0), 2);
    }

    #[test]
    fn resolve_phase_lower_bound_property() {
        let table = phases(&[0.0, 3.5, 7.0, 18.25, 40.0]);
        let mut elapsed = 0.0;
        while elapsed < 50.0 {
            let i = resolve_phase(&table, elapsed);
            assert!(table[i].start_min <= elapsed);
            if i + 1 < table.len() {
                assert!(table[i + 1].start_min > elapsed);
            }
            elapsed += 0.5;
        }
    }

    #[test]
    fn round_helpers_clamp_domains() {
        assert_eq!(round_percent(-3.0), 0);
        assert_eq!(round_percent(49.6), 50);
        assert_eq!(round_percent(140.0), 100);
        assert_eq!(round_per_hour(-1.0), 0);
        assert_eq!(round_per_hour(59.5), 60);
    }
}
