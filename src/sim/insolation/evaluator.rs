use serde::{Deserialize, Serialize};

use crate::sim::solar::SunPath;

/// Normative parameters of the insolation rule, all in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsolationNorm {
    /// Required continuous or cumulative direct sun.
    pub normative_minutes: f64,
    /// Deducted for every single missed sample bridged inside a period.
    pub gap_penalty_minutes: f64,
    /// Added to the requirement when the sun comes in several periods.
    pub interruption_penalty_minutes: f64,
    /// Interrupted insolation fails unless one period is at least this long.
    pub min_period_for_interrupted_minutes: f64,
    /// Shortage up to this value gives a warning instead of a failure.
    pub tolerance_minutes: f64,
}

impl Default for InsolationNorm {
    fn default() -> Self {
        Self {
            normative_minutes: 120.0,
            gap_penalty_minutes: 10.0,
            interruption_penalty_minutes: 30.0,
            min_period_for_interrupted_minutes: 60.0,
            tolerance_minutes: 30.0,
        }
    }
}

impl InsolationNorm {
    pub fn new(normative_minutes: f64) -> Self {
        Self {
            normative_minutes,
            ..Self::default()
        }
    }
}

/// Verdict class. Ordering follows severity: `Pass < Warning < Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warning,
    Fail,
}

impl Status {
    pub fn rank(&self) -> u8 {
        match self {
            Status::Pass => 0,
            Status::Warning => 1,
            Status::Fail => 2,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pass => "PASS",
            Status::Warning => "WARNING",
            Status::Fail => "FAIL",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsolationVerdict {
    pub status: Status,
    pub total_minutes: f64,
    pub required_minutes: f64,
    pub has_interruption: bool,
    /// Effective minutes of each period in chronological order.
    pub periods_minutes: Vec<f64>,
    pub max_period_minutes: f64,
    pub shortage_minutes: f64,
}

impl InsolationVerdict {
    fn no_sun(norm: &InsolationNorm) -> Self {
        Self {
            status: Status::Fail,
            total_minutes: 0.0,
            required_minutes: norm.normative_minutes,
            has_interruption: false,
            periods_minutes: vec![],
            max_period_minutes: 0.0,
            shortage_minutes: norm.normative_minutes,
        }
    }

    /// True if `self` is strictly more severe than `other`.
    pub fn is_worse_than(&self, other: &InsolationVerdict) -> bool {
        self.status.rank() > other.status.rank()
    }

    /// Severity order used to pick the worst of several verdicts.
    fn severity_cmp(&self, other: &InsolationVerdict) -> std::cmp::Ordering {
        self.status
            .cmp(&other.status)
            .then(other.total_minutes.total_cmp(&self.total_minutes))
    }
}

/// Classifies a fixed-step sequence of free (`true`) / blocked samples.
///
/// Free samples form one period while consecutive free indices differ by one.
/// A difference of exactly two (a single missed sample) is bridged and costs
/// `gap_penalty_minutes`. Anything larger starts a new period.
pub fn evaluate(free: &[bool], time_step_minutes: f64, norm: &InsolationNorm) -> InsolationVerdict {
    let mut periods: Vec<(usize, usize)> = Vec::new(); // (free samples, bridged gaps)
    let mut last: Option<usize> = None;
    for (i, _) in free.iter().enumerate().filter(|(_, f)| **f) {
        match (last, periods.last_mut()) {
            (Some(prev), Some(period)) if i - prev <= 2 => {
                period.0 += 1;
                if i - prev == 2 {
                    period.1 += 1;
                }
            }
            _ => periods.push((1, 0)),
        }
        last = Some(i);
    }

    if periods.is_empty() {
        return InsolationVerdict::no_sun(norm);
    }

    let periods_minutes: Vec<f64> = periods
        .iter()
        .map(|(count, gaps)| {
            *count as f64 * time_step_minutes - *gaps as f64 * norm.gap_penalty_minutes
        })
        .collect();
    let total_minutes: f64 = periods_minutes.iter().sum();
    let max_period_minutes = periods_minutes.iter().copied().fold(f64::MIN, f64::max);
    let has_interruption = periods_minutes.len() > 1;
    let required_minutes = if has_interruption {
        norm.normative_minutes + norm.interruption_penalty_minutes
    } else {
        norm.normative_minutes
    };
    let shortage_minutes = (required_minutes - total_minutes).max(0.0);

    let status = if has_interruption && max_period_minutes < norm.min_period_for_interrupted_minutes
    {
        Status::Fail
    } else if total_minutes >= required_minutes {
        Status::Pass
    } else if required_minutes - total_minutes <= norm.tolerance_minutes {
        Status::Warning
    } else {
        Status::Fail
    };

    InsolationVerdict {
        status,
        total_minutes,
        required_minutes,
        has_interruption,
        periods_minutes,
        max_period_minutes,
        shortage_minutes,
    }
}

/// Verdict over every analysed day of `sun`, given one flag per sample.
///
/// Each day is classified on its own (slots dropped for low sun count as
/// blocked) and the worst day is returned: highest status, then fewest
/// minutes.
pub fn evaluate_path(sun: &SunPath, free: &[bool], norm: &InsolationNorm) -> InsolationVerdict {
    let step = sun.time_step_minutes();
    sun.day_sequences(|i| free.get(i).copied().unwrap_or(false))
        .iter()
        .map(|day| evaluate(day, step, norm))
        .max_by(|a, b| a.severity_cmp(b))
        .unwrap_or_else(|| InsolationVerdict::no_sun(norm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector;
    use anyhow::Result;

    fn from_indices(len: usize, idx: &[usize]) -> Vec<bool> {
        let mut v = vec![false; len];
        for i in idx {
            v[*i] = true;
        }
        v
    }

    #[test]
    fn test_two_periods_not_bridged() {
        let free = from_indices(10, &[0, 1, 2, 5, 6, 7]);
        let v = evaluate(&free, 10.0, &InsolationNorm::default());
        assert_eq!(v.periods_minutes, vec![30.0, 30.0]);
        assert!(v.has_interruption);
        assert_eq!(v.total_minutes, 60.0);
        assert_eq!(v.required_minutes, 150.0);
        assert_eq!(v.max_period_minutes, 30.0);
        assert_eq!(v.shortage_minutes, 90.0);
        assert_eq!(v.status, Status::Fail);
    }

    #[test]
    fn test_single_gap_bridged_with_penalty() {
        // 14 free samples with one hole: 140 - 10 = 130 minutes, one period
        let mut free = vec![true; 15];
        free[7] = false;
        let v = evaluate(&free, 10.0, &InsolationNorm::default());
        assert_eq!(v.periods_minutes, vec![130.0]);
        assert!(!v.has_interruption);
        assert_eq!(v.status, Status::Pass);
    }

    #[test]
    fn test_warning_within_tolerance() {
        let free = vec![true; 10];
        let v = evaluate(&free, 10.0, &InsolationNorm::default());
        assert_eq!(v.total_minutes, 100.0);
        assert_eq!(v.shortage_minutes, 20.0);
        assert_eq!(v.status, Status::Warning);

        let free = vec![true; 8];
        let v = evaluate(&free, 10.0, &InsolationNorm::default());
        assert_eq!(v.shortage_minutes, 40.0);
        assert_eq!(v.status, Status::Fail);
    }

    #[test]
    fn test_interrupted_needs_long_period() {
        let norm = InsolationNorm::default();
        // 100 + 100 minutes, interrupted: required 150, longest 100 -> pass
        let mut free = vec![true; 10];
        free.extend(vec![false; 5]);
        free.extend(vec![true; 10]);
        assert_eq!(evaluate(&free, 10.0, &norm).status, Status::Pass);

        // Ten 50-minute periods: plenty of total but no period reaches 60
        let mut free = Vec::new();
        for _ in 0..10 {
            free.extend(vec![true; 5]);
            free.extend(vec![false; 3]);
        }
        let v = evaluate(&free, 10.0, &norm);
        assert_eq!(v.total_minutes, 500.0);
        assert_eq!(v.status, Status::Fail);
    }

    #[test]
    fn test_no_sun_fails() {
        let v = evaluate(&[false; 20], 10.0, &InsolationNorm::default());
        assert_eq!(v.status, Status::Fail);
        assert_eq!(v.total_minutes, 0.0);
        assert!(v.periods_minutes.is_empty());
        let v = evaluate(&[], 10.0, &InsolationNorm::default());
        assert_eq!(v.status, Status::Fail);
    }

    #[test]
    fn test_status_order() {
        assert!(Status::Pass < Status::Warning);
        assert!(Status::Warning < Status::Fail);
        assert_eq!(Status::Fail.rank(), 2);
        assert_eq!(Status::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_evaluate_path_single_day() -> Result<()> {
        let sun = SunPath::from_directions(&vec![Vector::new(0., -1., 1.); 20], 10.0)?;
        let free = vec![true; 20];
        let v = evaluate_path(&sun, &free, &InsolationNorm::default());
        assert_eq!(v.status, Status::Pass);
        assert_eq!(v.total_minutes, 200.0);

        let mut free = vec![true; 20];
        free[10] = false;
        free[11] = false;
        let v = evaluate_path(&sun, &free, &InsolationNorm::default());
        assert!(v.has_interruption);
        assert_eq!(v.total_minutes, 180.0);
        Ok(())
    }
}
