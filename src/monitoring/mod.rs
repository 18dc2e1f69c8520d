/*!
 * Monitoring
 * Tracing initialization for the client
 */

mod tracer;

pub use tracer::init_tracing;
