/*!
 * Driver Module
 * External collaborator: driver load/unload and the simulated event producer
 */

pub mod loader;
pub mod sim;

// Re-export for convenience
pub use loader::DriverLoader;
pub use sim::SimulatedDriver;
