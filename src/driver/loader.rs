/*!
 * Driver Loader
 * Boolean load/unload surface consumed before any subscription is created
 */

use super::sim::SimulatedDriver;
use crate::bridge::InMemoryBackend;
use crate::channel::LoopbackHub;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads and unloads the event-interception driver.
///
/// External collaborator with a deliberately thin surface: success or
/// failure, nothing else. This build fronts the simulated driver; a real
/// deployment substitutes the OS loader behind the same two calls.
pub struct DriverLoader {
    hub: Arc<LoopbackHub>,
    driver: Mutex<Option<Arc<SimulatedDriver>>>,
}

impl DriverLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hub: Arc::new(LoopbackHub::new()),
            driver: Mutex::new(None),
        }
    }

    /// Connector subscriptions should open their channels through
    #[must_use]
    pub fn hub(&self) -> &Arc<LoopbackHub> {
        &self.hub
    }

    /// Load the driver image and register it as a minifilter at `altitude`
    pub fn load_as_filter(&self, image: &Path, altitude: &str) -> bool {
        let mut slot = self.driver.lock();
        if slot.is_some() {
            warn!("driver already loaded");
            return false;
        }
        info!(image = %image.display(), altitude, "loading driver as minifilter");
        let driver = SimulatedDriver::install(&self.hub, Arc::new(InMemoryBackend::new()));
        *slot = Some(Arc::new(driver));
        true
    }

    /// Unload the driver, tearing every category port down
    pub fn unload(&self) -> bool {
        match self.driver.lock().take() {
            Some(driver) => {
                driver.teardown();
                info!("driver unloaded");
                true
            }
            None => false,
        }
    }

    /// The loaded driver, if any
    #[must_use]
    pub fn driver(&self) -> Option<Arc<SimulatedDriver>> {
        self.driver.lock().clone()
    }
}

impl Default for DriverLoader {
    fn default() -> Self {
        Self::new()
    }
}
