//! Threshold-banded rubrics
//!
//! A rubric is an ordered list of closed intervals `[low, high]`, each with
//! a label and a sub-score. Scanning is first-match-wins: when two adjacent
//! bands share a boundary, the value on that boundary belongs to the band
//! listed first. A value outside every band is `Unclassified` with score 0.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Label returned when no band contains the value
pub const UNCLASSIFIED: &str = "Unclassified";

/// One closed interval of a rubric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub low: f64,
    pub high: f64,
    pub label: String,
    pub score: f64,
}

impl ThresholdBand {
    pub fn new(low: f64, high: f64, label: impl Into<String>, score: f64) -> Self {
        Self {
            low,
            high,
            label: label.into(),
            score,
        }
    }

    /// Inclusive on both ends
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Label and sub-score assigned to a value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Grade<'a> {
    pub label: &'a str,
    pub score: f64,
}

impl Grade<'_> {
    pub const UNCLASSIFIED: Grade<'static> = Grade {
        label: UNCLASSIFIED,
        score: 0.0,
    };

    pub fn is_classified(&self) -> bool {
        self.label != UNCLASSIFIED
    }
}

/// Grades `value` against `bands` in the order given
///
/// Total: NaN and values outside every band are [`Grade::UNCLASSIFIED`].
pub fn classify(value: f64, bands: &[ThresholdBand]) -> Grade<'_> {
    bands
        .iter()
        .find(|band| band.contains(value))
        .map(|band| Grade {
            label: &band.label,
            score: band.score,
        })
        .unwrap_or(Grade::UNCLASSIFIED)
}

/// Caller-supplied context for a scoring run
///
/// There is no clock access: whether readings were taken by day is decided
/// by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringContext {
    pub is_day: bool,
}

impl ScoringContext {
    pub const DAY: Self = Self { is_day: true };
    pub const NIGHT: Self = Self { is_day: false };

    pub const fn new(is_day: bool) -> Self {
        Self { is_day }
    }
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self::DAY
    }
}

/// Band set for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rubric {
    /// Separate day and night bands, picked by [`ScoringContext::is_day`]
    DayNight {
        day: Vec<ThresholdBand>,
        night: Vec<ThresholdBand>,
    },
    Fixed { bands: Vec<ThresholdBand> },
}

impl Rubric {
    pub fn fixed(bands: Vec<ThresholdBand>) -> Self {
        Rubric::Fixed { bands }
    }

    pub fn day_night(day: Vec<ThresholdBand>, night: Vec<ThresholdBand>) -> Self {
        Rubric::DayNight { day, night }
    }

    /// Bands in effect for `context`
    pub fn bands(&self, context: ScoringContext) -> &[ThresholdBand] {
        match self {
            Rubric::Fixed { bands } => bands,
            Rubric::DayNight { day, .. } if context.is_day => day,
            Rubric::DayNight { night, .. } => night,
        }
    }

    pub fn classify(&self, value: f64, context: ScoringContext) -> Grade<'_> {
        classify(value, self.bands(context))
    }

    /// Every band list non-empty, bounds ordered and not NaN, scores finite
    pub fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        let lists: Vec<&[ThresholdBand]> = match self {
            Rubric::Fixed { bands } => vec![bands.as_slice()],
            Rubric::DayNight { day, night } => vec![day.as_slice(), night.as_slice()],
        };

        for bands in lists {
            if bands.is_empty() {
                return Err(ConfigurationError::EmptyRubric(name.to_string()));
            }
            for (index, band) in bands.iter().enumerate() {
                if band.low.is_nan() || band.high.is_nan() || band.low > band.high {
                    return Err(ConfigurationError::InvalidBand {
                        rubric: name.to_string(),
                        index,
                        low: band.low,
                        high: band.high,
                    });
                }
                if !band.score.is_finite() {
                    return Err(ConfigurationError::InvalidScore {
                        rubric: name.to_string(),
                        index,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn green_only() -> Vec<ThresholdBand> {
        vec![ThresholdBand::new(60.0, 80.0, "Green", 10.0)]
    }

    #[test]
    fn test_single_band_match() {
        let bands = green_only();
        assert_eq!(classify(70.0, &bands), Grade { label: "Green", score: 10.0 });
    }

    #[test]
    fn test_unclassified_fallthrough() {
        let bands = green_only();
        let grade = classify(200.0, &bands);
        assert_eq!(grade, Grade::UNCLASSIFIED);
        assert_eq!(grade.label, "Unclassified");
        assert_eq!(grade.score, 0.0);
        assert!(!grade.is_classified());
    }

    #[test]
    fn test_inclusive_bounds() {
        let bands = green_only();
        assert_eq!(classify(60.0, &bands).label, "Green");
        assert_eq!(classify(80.0, &bands).label, "Green");
        assert_eq!(classify(80.000001, &bands).label, UNCLASSIFIED);
    }

    #[test]
    fn test_shared_boundary_first_listed_wins() {
        let bands = vec![
            ThresholdBand::new(0.0, 50.0, "Good", 10.0),
            ThresholdBand::new(50.0, 100.0, "Fair", 5.0),
        ];
        assert_eq!(classify(50.0, &bands).label, "Good");

        let reversed: Vec<_> = bands.into_iter().rev().collect();
        assert_eq!(classify(50.0, &reversed).label, "Fair");
    }

    #[test]
    fn test_total_over_odd_inputs() {
        let bands = vec![ThresholdBand::new(f64::NEG_INFINITY, f64::INFINITY, "Any", 1.0)];
        assert_eq!(classify(f64::MAX, &bands).label, "Any");
        assert_eq!(classify(f64::NEG_INFINITY, &bands).label, "Any");
        assert_eq!(classify(f64::NAN, &bands), Grade::UNCLASSIFIED);
        assert_eq!(classify(1.0, &[]), Grade::UNCLASSIFIED);
    }

    #[test]
    fn test_day_night_selection() {
        let rubric = Rubric::day_night(
            vec![ThresholdBand::new(20.0, 26.0, "Comfortable", 10.0)],
            vec![ThresholdBand::new(16.0, 21.0, "Comfortable", 10.0)],
        );
        assert_eq!(rubric.classify(24.0, ScoringContext::DAY).score, 10.0);
        assert_eq!(rubric.classify(24.0, ScoringContext::NIGHT), Grade::UNCLASSIFIED);
        assert_eq!(rubric.classify(17.0, ScoringContext::new(false)).score, 10.0);
    }

    #[test]
    fn test_fixed_ignores_context() {
        let rubric = Rubric::fixed(green_only());
        assert_eq!(
            rubric.classify(65.0, ScoringContext::DAY),
            rubric.classify(65.0, ScoringContext::NIGHT)
        );
    }

    #[test]
    fn test_validate() {
        assert!(Rubric::fixed(green_only()).validate("humidity").is_ok());
        assert_eq!(
            Rubric::fixed(Vec::new()).validate("humidity"),
            Err(ConfigurationError::EmptyRubric("humidity".into()))
        );
        assert!(matches!(
            Rubric::day_night(green_only(), vec![ThresholdBand::new(5.0, 1.0, "x", 1.0)])
                .validate("temperature"),
            Err(ConfigurationError::InvalidBand { index: 0, .. })
        ));
        assert!(matches!(
            Rubric::fixed(vec![ThresholdBand::new(0.0, 1.0, "x", f64::NAN)]).validate("gas"),
            Err(ConfigurationError::InvalidScore { index: 0, .. })
        ));
    }

    #[test]
    fn test_context_default_is_day() {
        assert!(ScoringContext::default().is_day);
    }
}
