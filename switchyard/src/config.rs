//! scenario configuration: where base networks come from, which project
//! cards to apply, and where outputs land. the core reads an
//! already-parsed value; file parsing lives with the caller.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::io::{RoadwayFileFormat, TransitFileFormat};
use switchyard_core::config::RuntimeConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadwayInputConfig {
    pub dir: PathBuf,
    pub file_format: RoadwayFileFormat,
    pub read_in_shapes: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitInputConfig {
    pub dir: PathBuf,
    pub file_format: TransitFileFormat,
}

/// the starting point of a scenario: base networks plus projects already
/// baked into them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseScenarioConfig {
    pub roadway: Option<RoadwayInputConfig>,
    pub transit: Option<TransitInputConfig>,
    pub applied_projects: Vec<String>,
    pub conflicts: HashMap<String, Vec<String>>,
}

/// which project cards to apply, resolved to a flat ordered list by the
/// caller, optionally filtered by tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsConfig {
    pub project_card_filepath: Vec<PathBuf>,
    pub filter_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadwayOutputConfig {
    pub out_dir: PathBuf,
    pub prefix: String,
    pub file_format: RoadwayFileFormat,
}

impl Default for RoadwayOutputConfig {
    fn default() -> Self {
        RoadwayOutputConfig {
            out_dir: PathBuf::from("roadway"),
            prefix: String::new(),
            file_format: RoadwayFileFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitOutputConfig {
    pub out_dir: PathBuf,
    pub prefix: String,
    pub file_format: TransitFileFormat,
}

impl Default for TransitOutputConfig {
    fn default() -> Self {
        TransitOutputConfig {
            out_dir: PathBuf::from("transit"),
            prefix: String::new(),
            file_format: TransitFileFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputScenarioConfig {
    pub path: PathBuf,
    pub roadway: Option<RoadwayOutputConfig>,
    pub transit: Option<TransitOutputConfig>,
    pub overwrite: bool,
}

impl Default for OutputScenarioConfig {
    fn default() -> Self {
        OutputScenarioConfig {
            path: PathBuf::from("."),
            roadway: None,
            transit: None,
            overwrite: true,
        }
    }
}

/// the full scenario configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub base_scenario: BaseScenarioConfig,
    pub projects: ProjectsConfig,
    pub output_scenario: OutputScenarioConfig,
    pub wrangler_config: RuntimeConfig,
}
