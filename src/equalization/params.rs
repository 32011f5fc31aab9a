use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::file_io::DEFAULT_IMAGE_EXTENSIONS;
use crate::core::partition::PartitionPolicy;

use super::{Equalizer, Strategy};

fn default_extensions() -> Vec<String> {
    DEFAULT_IMAGE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_worker_count() -> usize {
    4
}

/**
 * Complete set of parameters that are fed in from the JSON for one batch run.
 */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EqualizerParams {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub strategy: Strategy,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Falls back to `Strategy::default_policy` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remainder_policy: Option<PartitionPolicy>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl EqualizerParams {
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    pub fn effective_policy(&self) -> PartitionPolicy {
        self.remainder_policy
            .unwrap_or_else(|| self.strategy.default_policy())
    }

    pub fn equalizer(&self) -> Equalizer {
        Equalizer::new(self.strategy, self.worker_count, self.effective_policy())
    }
}
