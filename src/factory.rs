//! Adapters that turn a callback-style invocation into a [`Promise`].
//!
//! A callback-style operation signals completion by settling the
//! [`Completion`] it is handed rather than by returning a value. The factory
//! invokes the operation right away, at call time, and hands back the promise
//! whether or not the operation has settled yet.

use crate::promise::{Completion, Promise};

/// Invokes `op` now and returns the promise its completion feeds.
///
/// The operation may settle synchronously before `promise` returns, or stash
/// the [`Completion`] and settle later from an event-loop turn; the caller
/// holds the returned promise either way. A panic inside `op` propagates to
/// the caller unmodified — only chain steps convert synchronous failure into
/// a promise failure.
///
/// # Examples
///
/// ```
/// use promise_chain::{promise, Completion};
///
/// fn lookup(key: &str, done: Completion<u32, String>) {
///     match key {
///         "port" => done.resolve(8080),
///         other => done.reject(format!("unknown key {other}")),
///     }
/// }
///
/// let port = promise(|done| lookup("port", done));
/// port.register(|outcome| assert_eq!(outcome, Ok(8080)));
/// ```
pub fn promise<T, E, F>(op: F) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(Completion<T, E>),
{
    let handle = Promise::new();
    op(handle.completion());
    handle
}

/// Bound-arguments variant of [`promise`].
///
/// Callee and argument value travel together: `op` receives `args` back,
/// followed by the completion. Handy when the operation is a plain `fn` item
/// rather than a capturing closure.
///
/// # Examples
///
/// ```
/// use promise_chain::{promise_with, Completion};
///
/// fn double(n: u32, done: Completion<u32, String>) {
///     done.resolve(n * 2);
/// }
///
/// let doubled = promise_with(double, 21);
/// doubled.register(|outcome| assert_eq!(outcome, Ok(42)));
/// ```
pub fn promise_with<A, T, E, F>(op: F, args: A) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(A, Completion<T, E>),
{
    let handle = Promise::new();
    op(args, handle.completion());
    handle
}
