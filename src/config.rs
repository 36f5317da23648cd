use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::advancement::BracketTemplate;
use crate::constants::{DEFAULT_TRIALS_PER_BATCH, RUN_ID_STRIDE};
use crate::error::{Result, SimError};
use crate::season::largest_job_size;
use crate::simulator::RatingPerturbation;

/// Settings for a simulation run.
///
/// Every field has a default, so a JSON file only needs the values it
/// changes:
///
/// ```json
/// { "trials_per_batch": 500, "perturbation": { "kind": "offsets", "magnitude": 30.0 } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub trials_per_batch: u32,
    pub perturbation: RatingPerturbation,
    pub bracket: BracketTemplate,
    /// Base seed; each batch mixes in its job id. Entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            trials_per_batch: DEFAULT_TRIALS_PER_BATCH,
            perturbation: RatingPerturbation::None,
            bracket: BracketTemplate::mlb(),
            seed: None,
        }
    }
}

impl SimConfig {
    /// Load and validate a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials_per_batch == 0 {
            return Err(SimError::InvalidConfig(
                "trials_per_batch must be positive".to_string(),
            ));
        }
        // Staggered batches grow past the average; the largest must still
        // fit under the run id stride
        if largest_job_size(self.trials_per_batch) as u64 > RUN_ID_STRIDE {
            return Err(SimError::InvalidConfig(format!(
                "trials_per_batch {} gives batches over {} trials",
                self.trials_per_batch, RUN_ID_STRIDE
            )));
        }
        self.perturbation.validate()?;
        self.bracket.validate()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trials_per_batch(mut self, trials: u32) -> Self {
        self.trials_per_batch = trials;
        self
    }

    pub fn with_perturbation(mut self, perturbation: RatingPerturbation) -> Self {
        self.perturbation = perturbation;
        self
    }
}
