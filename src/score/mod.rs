pub mod due;
pub mod late;

use crate::error::{GraderError, Result};
use chrono::{DateTime, Utc};
use late::{late_penalty, LatePolicy};

/// Immutable scoring parameters for one grading run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub multiplier: f64,
    /// Points awarded for a fully passing submission.
    pub points: f64,
    pub max_points: Option<f64>,
    pub due: Option<DateTime<Utc>>,
    pub late: LatePolicy,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            points: 1.0,
            max_points: None,
            due: None,
            late: LatePolicy::None,
        }
    }
}

impl ScoringOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(GraderError::InvalidScoreInput(format!(
                "multiplier must be a non-negative number (found {})",
                self.multiplier
            )));
        }
        if !self.points.is_finite() || self.points <= 0.0 {
            return Err(GraderError::InvalidScoreInput(format!(
                "points must be greater than 0 (found {})",
                self.points
            )));
        }
        if let Some(max_points) = self.max_points {
            if !max_points.is_finite() || max_points < 0.0 {
                return Err(GraderError::InvalidScoreInput(format!(
                    "max points must be non-negative (found {max_points})"
                )));
            }
        }
        self.late.validate()
    }

    pub fn penalty_at(&self, submitted_at: DateTime<Utc>) -> f64 {
        match self.due {
            Some(due) => late_penalty(&self.late, submitted_at - due),
            None => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub raw: f64,
    pub late_penalty: f64,
    pub value: f64,
}

/// Parses a CI outcome into a fraction of credit earned.
///
/// Accepts run conclusions, `passed/total` counts, and plain fractions.
pub fn parse_raw(outcome: &str) -> Result<f64> {
    let outcome = outcome.trim();
    match outcome {
        "success" => return Ok(1.0),
        "failure" | "timed_out" => return Ok(0.0),
        _ => {}
    }

    if let Some((passed, total)) = outcome.split_once('/') {
        let passed: u32 = passed.trim().parse().map_err(|_| malformed(outcome))?;
        let total: u32 = total.trim().parse().map_err(|_| malformed(outcome))?;
        if total == 0 || passed > total {
            return Err(malformed(outcome));
        }
        return Ok(f64::from(passed) / f64::from(total));
    }

    match outcome.parse::<f64>() {
        Ok(fraction) if (0.0..=1.0).contains(&fraction) => Ok(fraction),
        _ => Err(malformed(outcome)),
    }
}

fn malformed(outcome: &str) -> GraderError {
    GraderError::InvalidScoreInput(format!("unrecognized test outcome `{outcome}`"))
}

/// `raw × points × multiplier × late_penalty`, clamped to `[0, max_points]`.
pub fn compute(raw: f64, submitted_at: DateTime<Utc>, options: &ScoringOptions) -> Result<Score> {
    options.validate()?;
    if !(0.0..=1.0).contains(&raw) {
        return Err(GraderError::InvalidScoreInput(format!(
            "raw score must be between 0.0 and 1.0 (found {raw})"
        )));
    }
    let late_penalty = options.penalty_at(submitted_at);
    let upper = options.max_points.unwrap_or(f64::INFINITY);
    let value = (raw * options.points * options.multiplier * late_penalty).clamp(0.0, upper);
    Ok(Score {
        raw,
        late_penalty,
        value,
    })
}

/// Formats a score for the grading API, at most four decimals.
pub fn format_grade(score: f64) -> String {
    let rounded = format!("{score:.4}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
