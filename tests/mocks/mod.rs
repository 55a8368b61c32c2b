//! Mock entities and protocols for testing without pipeline output.
//!
//! This module provides a small dataset model and a protocol over it that can
//! be loaded with passing, failing and crashing checks.


pub use entities::*;
pub use protocol::*;

/// Route engine logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
