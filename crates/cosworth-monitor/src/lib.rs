//! Cosworth Datastream Monitor
//!
//! Bootstrap and coordination glue around the acquisition core: config
//! loading, logging, the coordinator loop, the terminal dashboard and the
//! button input source.

pub mod buttons;
pub mod config;
pub mod coordinator;
pub mod worker;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
