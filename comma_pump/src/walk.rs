// Pump walks: the pitch trajectory traced by playing a pump one move at a time.
//
// A pump `x` over steps `s` is unrolled into unit moves: coefficient `xᵢ`
// becomes `|xᵢ|` moves of `±sᵢ`, in coefficient order. The walk records the
// cumulative just-intonation offset after every move and, when an EDO is
// given, the offset of the same walk with each move rounded to the nearest
// EDO step. For a valid pump the JI walk ends exactly one target comma away
// from where it started; for an EDO that tempers the comma out, the rounded
// walk returns home (net 0).
//
// Move sizes are the signed cents of each step's monzo, not `Step::cents`,
// because vocabulary steps carry their unsigned size for sorting.

use crate::error::{PumpError, Result};
use crate::monzo::{Step, cents};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_PITCH_HZ: f64 = 440.0;

/// Cents below which a step is treated as a unison and skipped.
const UNISON_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkOptions {
    /// Equal division of the octave to project moves onto, if any.
    pub edo: Option<u32>,
    /// Pitch of the walk's starting point. Clamped to at least 1 Hz.
    pub base_pitch_hz: f64,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            edo: None,
            base_pitch_hz: DEFAULT_BASE_PITCH_HZ,
        }
    }
}

/// One unit move of a walk.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalkPoint {
    /// 1-based position in the walk.
    pub index: usize,
    /// Index of the step this move belongs to.
    pub step_index: usize,
    /// Signed step name, e.g. `"- 5/4"`.
    pub label: String,
    /// `+1` or `-1`.
    pub direction: i64,
    /// 1-based repeat number within this step's coefficient, of `repeat_count`.
    pub repeat: u64,
    pub repeat_count: u64,
    pub delta_ji: f64,
    pub cumulative_ji: f64,
    pub delta_edo: Option<f64>,
    pub cumulative_edo: Option<f64>,
    pub freq_hz_ji: f64,
    pub freq_hz_edo: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalkSummary {
    pub total_moves: u64,
    pub net_cents: f64,
    pub net_cents_edo: Option<f64>,
    pub edo: Option<u32>,
    pub edo_step_cents: Option<f64>,
    pub base_pitch_hz: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PumpWalk {
    pub points: Vec<WalkPoint>,
    pub summary: WalkSummary,
}

fn cents_to_hz(base_hz: f64, cents: f64) -> f64 {
    base_hz * (cents / 1200.0).exp2()
}

/// Unroll `pump` over `steps` into unit moves.
pub fn build_pump_walk(pump: &[i64], steps: &[Step], primes: &[u64], options: &WalkOptions) -> Result<PumpWalk> {
    if pump.len() != steps.len() {
        return Err(PumpError::DimensionMismatch {
            what: "pump".to_string(),
            expected: steps.len(),
            found: pump.len(),
        });
    }
    let edo_step = options.edo.filter(|&n| n > 0).map(|n| 1200.0 / n as f64);
    let base_hz = if options.base_pitch_hz.is_finite() {
        options.base_pitch_hz.max(1.0)
    } else {
        DEFAULT_BASE_PITCH_HZ
    };

    let mut points = Vec::new();
    let mut cum_ji = 0.0;
    let mut cum_edo = edo_step.map(|_| 0.0);

    for (i, (&coeff, step)) in pump.iter().zip(steps).enumerate() {
        if coeff == 0 {
            continue;
        }
        let size = cents(&step.monzo, primes);
        if size.abs() < UNISON_EPSILON {
            continue;
        }
        let direction = coeff.signum();
        let repeats = coeff.unsigned_abs();
        let label = format!("{} {}", if direction > 0 { '+' } else { '-' }, step.name);
        let delta_ji = direction as f64 * size;
        let delta_edo = edo_step.map(|e| (delta_ji / e).round() * e);

        for r in 1..=repeats {
            cum_ji += delta_ji;
            if let (Some(c), Some(d)) = (cum_edo.as_mut(), delta_edo) {
                *c += d;
            }
            points.push(WalkPoint {
                index: points.len() + 1,
                step_index: i,
                label: label.clone(),
                direction,
                repeat: r,
                repeat_count: repeats,
                delta_ji,
                cumulative_ji: cum_ji,
                delta_edo,
                cumulative_edo: cum_edo,
                freq_hz_ji: cents_to_hz(base_hz, cum_ji),
                freq_hz_edo: cum_edo.map(|c| cents_to_hz(base_hz, c)),
            });
        }
    }

    Ok(PumpWalk {
        summary: WalkSummary {
            total_moves: points.len() as u64,
            net_cents: cum_ji,
            net_cents_edo: cum_edo,
            edo: options.edo,
            edo_step_cents: edo_step,
            base_pitch_hz: base_hz,
        },
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMES: [u64; 3] = [2, 3, 5];

    fn meantone_steps() -> Vec<Step> {
        vec![
            Step::new("3/2", vec![-1, 1, 0], &PRIMES),
            Step::new("5/4", vec![-2, 0, 1], &PRIMES),
            Step::new("2/1", vec![1, 0, 0], &PRIMES),
        ]
    }

    #[test]
    fn syntonic_pump_nets_one_comma() {
        let walk = build_pump_walk(&[4, -1, -2], &meantone_steps(), &PRIMES, &WalkOptions::default()).unwrap();
        assert_eq!(walk.summary.total_moves, 7);
        assert_eq!(walk.points.len(), 7);
        assert!((walk.summary.net_cents - 21.506).abs() < 1e-3);
        assert_eq!(walk.summary.net_cents_edo, None);
        assert_eq!(walk.points[0].label, "+ 3/2");
        assert_eq!(walk.points[4].label, "- 5/4");
        assert_eq!(walk.points[5].repeat, 1);
        assert_eq!(walk.points[6].repeat_count, 2);
        let last = &walk.points[6];
        assert!((last.freq_hz_ji - 440.0 * (21.506f64 / 1200.0).exp2()).abs() < 1e-2);
    }

    #[test]
    fn tempering_edo_walk_returns_home() {
        let options = WalkOptions {
            edo: Some(12),
            ..WalkOptions::default()
        };
        let walk = build_pump_walk(&[4, -1, -2], &meantone_steps(), &PRIMES, &options).unwrap();
        let net = walk.summary.net_cents_edo.unwrap();
        assert!(net.abs() < 1e-9, "net EDO cents {net}");
        assert_eq!(walk.points[0].delta_edo, Some(700.0));
        assert_eq!(walk.points[4].delta_edo, Some(-400.0));
    }

    #[test]
    fn unison_steps_and_zero_coefficients_skipped() {
        let mut steps = meantone_steps();
        steps.push(Step::from_monzo(vec![0, 0, 0]));
        let walk = build_pump_walk(&[0, 1, 0, 5], &steps, &PRIMES, &WalkOptions::default()).unwrap();
        assert_eq!(walk.summary.total_moves, 1);
        assert_eq!(walk.points[0].step_index, 1);
    }

    #[test]
    fn base_pitch_clamped() {
        let options = WalkOptions {
            edo: None,
            base_pitch_hz: -3.0,
        };
        let walk = build_pump_walk(&[0, 0, 1], &meantone_steps(), &PRIMES, &options).unwrap();
        assert_eq!(walk.summary.base_pitch_hz, 1.0);
        assert!((walk.points[0].freq_hz_ji - 2.0).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_rejected() {
        assert!(matches!(
            build_pump_walk(&[1], &meantone_steps(), &PRIMES, &WalkOptions::default()),
            Err(PumpError::DimensionMismatch { .. })
        ));
    }
}
