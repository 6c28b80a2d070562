use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::strava::StravaConfig;
use crate::types::AthleteParameters;

/// Athlete profile on disk: engine parameters plus optional Strava app credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    #[serde(flatten)]
    pub params: AthleteParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strava: Option<StravaConfig>,
}

/// Reads a profile from JSON. A missing file yields the default profile.
pub fn load_profile(path: impl AsRef<Path>) -> Result<AthleteProfile, StorageError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(
            "no profile at {}, using defaults ({:?})",
            path.display(),
            AthleteParameters::default()
        );
        return Ok(AthleteProfile::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let profile: AthleteProfile = serde_json::from_str(&contents)?;
    profile.params.validate().map_err(StorageError::InvalidParameters)?;
    info!(
        "profile loaded from {} (weight={}kg, hr {}-{}, offset={})",
        path.display(),
        profile.params.weight_kg,
        profile.params.hr_rest,
        profile.params.hr_max,
        profile.params.base_offset
    );
    Ok(profile)
}

/// Writes a profile as pretty-printed JSON.
pub fn save_profile(profile: &AthleteProfile, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let path = path.as_ref();
    profile.params.validate().map_err(StorageError::InvalidParameters)?;
    let json = serde_json::to_string_pretty(profile)?;
    std::fs::write(path, json)?;
    info!("profile saved to {}", path.display());
    Ok(())
}
