use crate::error::GraderError;
use crate::types::config::LateConfig;
use chrono::Duration;

/// Curve applied to submissions that arrive after the due date.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LatePolicy {
    #[default]
    None,
    /// Flat `factor` once the grace period has elapsed.
    Step { factor: f64, grace: Duration },
    /// Loses `per_day` for every started day past the grace period, never
    /// below `floor`.
    Linear {
        per_day: f64,
        floor: f64,
        grace: Duration,
    },
}

impl LatePolicy {
    pub fn validate(&self) -> Result<(), GraderError> {
        match *self {
            LatePolicy::None => Ok(()),
            LatePolicy::Step { factor, .. } => {
                if (0.0..=1.0).contains(&factor) {
                    Ok(())
                } else {
                    Err(GraderError::InvalidScoreInput(format!(
                        "late factor must be between 0.0 and 1.0 (found {factor})"
                    )))
                }
            }
            LatePolicy::Linear { per_day, floor, .. } => {
                if !per_day.is_finite() || per_day < 0.0 {
                    return Err(GraderError::InvalidScoreInput(format!(
                        "late decay per day must be non-negative (found {per_day})"
                    )));
                }
                if !(0.0..=1.0).contains(&floor) {
                    return Err(GraderError::InvalidScoreInput(format!(
                        "late floor must be between 0.0 and 1.0 (found {floor})"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl From<&LateConfig> for LatePolicy {
    fn from(config: &LateConfig) -> Self {
        match *config {
            LateConfig::None => LatePolicy::None,
            LateConfig::Step {
                factor,
                grace_minutes,
            } => LatePolicy::Step {
                factor,
                grace: Duration::minutes(i64::from(grace_minutes)),
            },
            LateConfig::Linear {
                per_day,
                floor,
                grace_minutes,
            } => LatePolicy::Linear {
                per_day,
                floor,
                grace: Duration::minutes(i64::from(grace_minutes)),
            },
        }
    }
}

/// Penalty multiplier for a submission `elapsed` after the due date.
///
/// Negative or zero `elapsed` means on time and always yields 1.0.
pub fn late_penalty(policy: &LatePolicy, elapsed: Duration) -> f64 {
    if elapsed <= Duration::zero() {
        return 1.0;
    }
    match *policy {
        LatePolicy::None => 1.0,
        LatePolicy::Step { factor, grace } => {
            if elapsed > grace {
                factor.clamp(0.0, 1.0)
            } else {
                1.0
            }
        }
        LatePolicy::Linear {
            per_day,
            floor,
            grace,
        } => {
            let past_grace = elapsed - grace;
            if past_grace <= Duration::zero() {
                return 1.0;
            }
            let days = started_days(past_grace);
            (1.0 - per_day * days as f64).max(floor).clamp(0.0, 1.0)
        }
    }
}

fn started_days(elapsed: Duration) -> i64 {
    let day_ms = Duration::days(1).num_milliseconds();
    let ms = elapsed.num_milliseconds();
    (ms + day_ms - 1) / day_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(per_day: f64) -> LatePolicy {
        LatePolicy::Linear {
            per_day,
            floor: 0.0,
            grace: Duration::zero(),
        }
    }

    #[test]
    fn on_time_is_full_credit_for_every_curve() {
        let policies = [
            LatePolicy::None,
            LatePolicy::Step {
                factor: 0.5,
                grace: Duration::zero(),
            },
            linear(0.25),
        ];
        for policy in &policies {
            assert_eq!(late_penalty(policy, Duration::zero()), 1.0);
            assert_eq!(late_penalty(policy, Duration::hours(-5)), 1.0);
        }
    }

    #[test]
    fn linear_decay_counts_started_days() {
        let policy = linear(0.1);
        assert!((late_penalty(&policy, Duration::days(2)) - 0.8).abs() < 1e-12);
        assert!((late_penalty(&policy, Duration::minutes(1)) - 0.9).abs() < 1e-12);
        assert!((late_penalty(&policy, Duration::hours(25)) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn linear_decay_stops_at_floor() {
        let policy = LatePolicy::Linear {
            per_day: 0.3,
            floor: 0.25,
            grace: Duration::zero(),
        };
        assert!((late_penalty(&policy, Duration::days(10)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn grace_period_delays_the_penalty() {
        let policy = LatePolicy::Step {
            factor: 0.5,
            grace: Duration::minutes(15),
        };
        assert_eq!(late_penalty(&policy, Duration::minutes(10)), 1.0);
        assert_eq!(late_penalty(&policy, Duration::minutes(16)), 0.5);
    }

    #[test]
    fn penalty_never_increases_with_lateness() {
        let policies = [
            linear(0.07),
            LatePolicy::Linear {
                per_day: 0.2,
                floor: 0.3,
                grace: Duration::hours(6),
            },
            LatePolicy::Step {
                factor: 0.6,
                grace: Duration::hours(1),
            },
        ];
        for policy in &policies {
            let mut previous = 1.0;
            for hours in -48..=24 * 20 {
                let penalty = late_penalty(policy, Duration::hours(hours));
                assert!(penalty <= previous, "{policy:?} increased at {hours}h");
                assert!((0.0..=1.0).contains(&penalty));
                previous = penalty;
            }
        }
    }

    #[test]
    fn validate_rejects_out_of_range_parameters() {
        assert!(LatePolicy::Step {
            factor: 1.1,
            grace: Duration::zero(),
        }
        .validate()
        .is_err());
        assert!(linear(-0.1).validate().is_err());
        assert!(linear(0.1).validate().is_ok());
    }
}
