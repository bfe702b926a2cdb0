//! Chainable promises for callback-style asynchronous code.
//!
//! A [`Promise`] is a single-fire multicast event: it captures the outcome of
//! one asynchronous operation and delivers it, in registration order, to
//! every continuation that cares. The [`promise`] factory wraps any
//! callback-style operation into one, and [`Promise::then`] strings such
//! operations into a linear pipeline that stops at the first failure.
//!
//! Simple usage:
//!
//! ```
//! use promise_chain::{promise, Completion};
//!
//! fn read_config(path: &'static str, done: Completion<String, String>) {
//!     // A real operation would settle `done` from a later event-loop turn.
//!     done.resolve(format!("contents of {path}"));
//! }
//!
//! let loaded = promise(|done| read_config("app.conf", done));
//! loaded.register(|outcome| {
//!     assert_eq!(outcome.unwrap(), "contents of app.conf");
//! });
//! ```
//!
//! Chaining:
//!
//! ```
//! use promise_chain::{promise, Completion, Promise};
//!
//! promise(|done: Completion<u64, String>| done.resolve(1024))
//!     .then(|len| Ok(Promise::resolved(len * 2)))
//!     .then(|len| {
//!         if len == 0 {
//!             return Err("empty".to_string());
//!         }
//!         Ok(Promise::resolved(len))
//!     })
//!     .register(|outcome| match outcome {
//!         Ok(len) => println!("read {len} bytes"),
//!         Err(err) => eprintln!("{err}"),
//!     });
//! ```
//!
//! The first step to fail — or an upstream failure before any step runs —
//! breaks the pipeline, and the terminal observer receives that failure
//! unchanged. Everything is single-threaded: delivery happens synchronously
//! inside [`Promise::fire`], and the handles are deliberately `!Send`.

mod chain;
mod factory;
mod promise;
mod waiter;

pub use chain::Chain;
pub use factory::{promise, promise_with};
pub use promise::{CallbackId, Completion, Promise};
pub use waiter::Waiter;
