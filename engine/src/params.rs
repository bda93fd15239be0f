use std::ops::RangeInclusive;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CFG_SCALE_RANGE: RangeInclusive<f64> = 1.0..=20.0;
pub const STEPS_RANGE: RangeInclusive<u32> = 10..=150;
pub const REALISM_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Numeric knobs for image generation. Lives in session state only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSet {
    pub cfg_scale: f64,
    pub steps: u32,
    pub realism_enhancement: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            cfg_scale: 7.5,
            steps: 50,
            realism_enhancement: 0.8,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("{field} must be within {range}, got {value}")]
pub struct ParameterError {
    pub field: &'static str,
    pub range: String,
    pub value: String,
}

fn check<T: PartialOrd + std::fmt::Display>(
    field: &'static str,
    range: &RangeInclusive<T>,
    value: T,
) -> Result<(), ParameterError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ParameterError {
            field,
            range: format!("[{}, {}]", range.start(), range.end()),
            value: value.to_string(),
        })
    }
}

impl ParameterSet {
    /// Rejects values a user could not have set with the sliders.
    /// NaN is never contained in a range, so it fails too.
    pub fn validate(&self) -> Result<(), ParameterError> {
        check("cfgScale", &CFG_SCALE_RANGE, self.cfg_scale)?;
        check("steps", &STEPS_RANGE, self.steps)?;
        check("realismEnhancement", &REALISM_RANGE, self.realism_enhancement)?;
        Ok(())
    }

    pub fn clamped(self) -> Self {
        Self {
            cfg_scale: clamp_f64(self.cfg_scale, &CFG_SCALE_RANGE, 7.5),
            steps: self.steps.clamp(*STEPS_RANGE.start(), *STEPS_RANGE.end()),
            realism_enhancement: clamp_f64(self.realism_enhancement, &REALISM_RANGE, 0.8),
        }
    }

    /// Turns a model's proposal into a valid set. Fields the model got wrong
    /// (not a number at all) keep their `initial` value, everything else is
    /// rounded and clamped.
    pub fn from_proposal(proposal: &ProposedParameters, initial: &ParameterSet) -> Self {
        let initial = initial.clamped();

        let cfg_scale = finite_or(proposal.cfg_scale, initial.cfg_scale, "cfgScale");
        let realism_enhancement = finite_or(
            proposal.realism_enhancement,
            initial.realism_enhancement,
            "realismEnhancement",
        );
        let steps = if proposal.steps.is_finite() {
            proposal
                .steps
                .round()
                .clamp(*STEPS_RANGE.start() as f64, *STEPS_RANGE.end() as f64) as u32
        } else {
            warn!("model proposed non-finite steps, keeping {}", initial.steps);
            initial.steps
        };

        let adjusted = Self {
            cfg_scale,
            steps,
            realism_enhancement,
        }
        .clamped();

        if adjusted.cfg_scale != proposal.cfg_scale
            || adjusted.steps as f64 != proposal.steps
            || adjusted.realism_enhancement != proposal.realism_enhancement
        {
            warn!("model proposal {proposal:?} normalized to {adjusted:?}");
        }

        adjusted
    }
}

/// Parameters as the model returns them: plain JSON numbers, possibly out of
/// range and possibly fractional steps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedParameters {
    pub cfg_scale: f64,
    pub steps: f64,
    pub realism_enhancement: f64,
}

fn finite_or(value: f64, fallback: f64, field: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("model proposed non-finite {field}, keeping {fallback}");
        fallback
    }
}

fn clamp_f64(value: f64, range: &RangeInclusive<f64>, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn proposal(cfg_scale: f64, steps: f64, realism_enhancement: f64) -> ProposedParameters {
        ProposedParameters {
            cfg_scale,
            steps,
            realism_enhancement,
        }
    }

    fn assert_in_range(p: &ParameterSet) {
        assert!(CFG_SCALE_RANGE.contains(&p.cfg_scale), "{p:?}");
        assert!(STEPS_RANGE.contains(&p.steps), "{p:?}");
        assert!(REALISM_RANGE.contains(&p.realism_enhancement), "{p:?}");
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ParameterSet::default().validate(), Ok(()));
    }

    #[test]
    fn validate_reports_the_field() {
        let err = ParameterSet {
            steps: 5,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "steps must be within [10, 150], got 5");

        let err = ParameterSet {
            cfg_scale: f64::NAN,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field, "cfgScale");
    }

    #[test]
    fn proposals_end_up_in_range() {
        let initial = ParameterSet::default();
        for p in [
            proposal(35.0, 400.0, 3.0),
            proposal(-2.0, 0.0, -1.0),
            proposal(0.5, 9.4, 1.0000001),
            proposal(f64::INFINITY, f64::NAN, f64::NEG_INFINITY),
            proposal(12.0, 72.6, 0.35),
        ] {
            assert_in_range(&ParameterSet::from_proposal(&p, &initial));
        }
    }

    #[test]
    fn proposal_details() {
        let initial = ParameterSet::default();
        let adjusted = ParameterSet::from_proposal(&proposal(12.0, 72.6, 0.35), &initial);
        assert_eq!(
            adjusted,
            ParameterSet {
                cfg_scale: 12.0,
                steps: 73,
                realism_enhancement: 0.35
            }
        );

        let adjusted = ParameterSet::from_proposal(&proposal(f64::NAN, 300.0, 0.9), &initial);
        assert_eq!(adjusted.cfg_scale, initial.cfg_scale);
        assert_eq!(adjusted.steps, 150);
    }

    #[test]
    fn wire_shape() {
        let json = serde_json::to_string(&ParameterSet::default()).unwrap();
        assert_eq!(json, r#"{"cfgScale":7.5,"steps":50,"realismEnhancement":0.8}"#);
        let p: ProposedParameters =
            serde_json::from_str(r#"{"cfgScale": 9, "steps": 60, "realismEnhancement": 1}"#)
                .unwrap();
        assert_eq!(p, proposal(9.0, 60.0, 1.0));
    }
}
