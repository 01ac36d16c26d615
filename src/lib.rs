//! # Timer Registry
//!
//! A registry of named callback timers for Rust built on top of Tokio.
//!
//! Timers are addressed by a string id instead of a raw task handle, so any
//! part of a program holding the registry can query, pause, resume or cancel
//! them.
//!
//! ## Features
//!
//! - **Named Timers**: Create, replace and cancel timers by string identifier
//! - **One-shot and Repeating**: Fire once, a fixed number of times, or until removed
//! - **Pause / Resume**: Disarm a timer without forgetting it
//! - **Fire-and-forget**: Untracked one-shot timers via [`TimerRegistry::simple`]
//! - **Fixed Cadence**: Firings are scheduled from the timer's start, not from the previous callback
//! - **Shutdown Hooks**: Cancelling the parent token or calling [`TimerRegistry::shutdown`]
//!   stops and forgets every timer
//! - **Lifecycle Logs**: Creation, firing, pause and expiry are reported through `log`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use timer_registry::{CancellationToken, Duration, TimerMode, TimerRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = TimerRegistry::new("my_registry".to_string(), CancellationToken::new());
//!
//!     let ticks = Arc::new(AtomicUsize::new(0));
//!     let counter = ticks.clone();
//!
//!     // Fire three times, 10ms apart
//!     registry.create(
//!         Some("heartbeat"),
//!         Duration::from_millis(10),
//!         TimerMode::Repeating(3),
//!         move || {
//!             counter.fetch_add(1, Ordering::SeqCst);
//!         },
//!     )?;
//!
//!     // Fire-and-forget
//!     registry.simple(Duration::from_millis(5), || println!("done"))?;
//!
//!     while registry.exists("heartbeat") {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//!     assert_eq!(ticks.load(Ordering::SeqCst), 3);
//!
//!     registry.shutdown();
//!     Ok(())
//! }
//! ```

mod entry;
mod error;
mod registry;

pub use entry::TimerMode;
pub use error::TimerError;
pub use registry::TimerRegistry;

// Re-export commonly used types for convenience
pub use std::time::Duration;
pub use tokio_util::sync::CancellationToken;
