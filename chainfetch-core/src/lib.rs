//! Cancellation primitives for chainfetch.
//!
//! This crate provides the cancellation types shared by the `chainfetch`
//! client and anything that wants to cancel a request from the outside.
//!
//! ## Modules
//!
//! - [`AbortController`] / [`AbortSignal`]: a one-shot cancellation handle and
//!   the observable signal it controls
//! - [`AbortReason`]: why a signal fired (explicit abort or elapsed timer)
//! - [`any`] / [`combine`]: merge several signals into one
//!
//! ## Example
//!
//! ```
//! use chainfetch_core::{AbortController, AbortReason, combine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let controller = AbortController::new();
//! let signal = combine(Some(controller.signal()), None).unwrap();
//!
//! controller.abort();
//! assert_eq!(signal.aborted().await, AbortReason::Aborted(None));
//! # }
//! ```

mod combine;
mod reason;
mod signal;

pub use combine::{any, combine};
pub use reason::AbortReason;
pub use signal::{AbortController, AbortSignal};
