/*!
 * Client Configuration
 * Defaults from the deployed driver package, overridable via FLT_* env vars
 */

use crate::policy::FilterPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Configuration for the demo client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Driver image handed to the loader
    pub driver_image: PathBuf,
    /// Minifilter altitude the driver registers at
    pub altitude: String,
    /// Path suffix marking protected files
    pub protect_suffix: String,
    /// Largest transfer worth mapping, in bytes
    pub max_inspect_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            driver_image: PathBuf::from(r"C:\Temp\fltbridge\fltbridge.sys"),
            altitude: "260000".to_string(),
            protect_suffix: ".prot".to_string(),
            max_inspect_size: 4096,
        }
    }
}

impl ClientConfig {
    /// Build from environment, falling back to defaults field by field.
    ///
    /// Variables: FLT_DRIVER_IMAGE, FLT_ALTITUDE, FLT_PROTECT_SUFFIX,
    /// FLT_MAX_INSPECT_SIZE.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            driver_image: std::env::var("FLT_DRIVER_IMAGE")
                .map(PathBuf::from)
                .unwrap_or(defaults.driver_image),
            altitude: std::env::var("FLT_ALTITUDE").unwrap_or(defaults.altitude),
            protect_suffix: std::env::var("FLT_PROTECT_SUFFIX").unwrap_or(defaults.protect_suffix),
            max_inspect_size: std::env::var("FLT_MAX_INSPECT_SIZE")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(raw = %raw, error = %e, "ignoring unparsable FLT_MAX_INSPECT_SIZE");
                        None
                    }
                })
                .unwrap_or(defaults.max_inspect_size),
        }
    }

    /// The filter policy this configuration describes
    #[must_use]
    pub fn policy(&self) -> FilterPolicy {
        FilterPolicy::new(self.protect_suffix.clone(), self.max_inspect_size)
    }
}
