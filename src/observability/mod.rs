//! Observability for the adapter
//!
//! Structured logging through `tracing`. Library code only emits events;
//! installing a subscriber is left to the binary (or the embedding engine)
//! through [`init_logging`].
//!
//! # Usage
//!
//! ```ignore
//! use policy_store_adapter::observability::{init_logging, AdapterEvent, OperationScope};
//!
//! init_logging();
//! let scope = OperationScope::new(AdapterEvent::LoadPolicy);
//! // ... run the operation ...
//! scope.complete("loaded(12)");
//! ```

mod events;
mod scope;

pub use events::AdapterEvent;
pub use scope::OperationScope;

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling it more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
