//! Fixed-cadence frame sampling.

use anyhow::Result;

use crate::error::PipelineError;

/// Run the classifier on every fifth decoded frame.
pub const DEFAULT_CADENCE: u32 = 5;

/// Decides which decoded frames are scored.
///
/// Indices are 0-based over every decoded frame, scored or not, so frame `0` is
/// always eligible and `n` frames yield `ceil(n / cadence)` eligible ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sampler {
    cadence: u32,
}

impl Sampler {
    pub fn new(cadence: u32) -> Result<Self> {
        if cadence == 0 {
            return Err(PipelineError::config("sampling cadence must be at least 1").into());
        }
        Ok(Self { cadence })
    }

    pub fn cadence(&self) -> u32 {
        self.cadence
    }

    pub fn is_eligible(&self, index: u64) -> bool {
        index % self.cadence as u64 == 0
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};

    #[test]
    fn default_cadence_picks_every_fifth_frame() {
        let sampler = Sampler::default();
        let picked: Vec<u64> = (0..12).filter(|&i| sampler.is_eligible(i)).collect();
        assert_eq!(picked, vec![0, 5, 10]);
    }

    #[test]
    fn eligible_count_is_ceil_of_frames_over_cadence() {
        for cadence in 1..=9u32 {
            let sampler = Sampler::new(cadence).unwrap();
            for n in 0..=40u64 {
                let eligible = (0..n).filter(|&i| sampler.is_eligible(i)).count() as u64;
                assert_eq!(eligible, n.div_ceil(cadence as u64), "n={n} c={cadence}");
            }
        }
    }

    #[test]
    fn cadence_one_scores_everything() {
        let sampler = Sampler::new(1).unwrap();
        assert!((0..20).all(|i| sampler.is_eligible(i)));
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let err = Sampler::new(0).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Config));
    }
}
