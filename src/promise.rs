//! The single-fire multicast event underneath everything else in this crate.
//!
//! A [`Promise`] starts out pending, collects continuations, and delivers the
//! outcome of its first (and only) [`fire`](Promise::fire) to every one of
//! them, in registration order. Continuations registered after the fact are
//! replayed immediately with the captured outcome.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>)>;

/// Ticket handed out by [`Promise::register`], accepted by
/// [`Promise::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

struct Inner<T, E> {
    /// `None` while pending. Written exactly once; every continuation sees a
    /// clone of the same value.
    outcome: Option<Result<T, E>>,
    callbacks: Vec<(CallbackId, Continuation<T, E>)>,
    next_id: u64,
}

/// A deferred result that any number of continuations can observe.
///
/// `Promise` is a cheap handle; cloning it clones the handle, not the state.
/// All handles are `!Send` — the whole crate assumes a single-threaded,
/// event-driven caller, and delivery happens synchronously inside
/// [`fire`](Promise::fire).
///
/// # Examples
///
/// ```
/// use promise_chain::Promise;
///
/// let answer: Promise<u32, String> = Promise::new();
/// answer.register(|outcome| assert_eq!(outcome, Ok(42)));
/// answer.fire(Ok(42));
/// ```
pub struct Promise<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("fired", &inner.outcome.is_some())
            .field("pending_callbacks", &inner.callbacks.len())
            .finish()
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// A pending promise with no continuations.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                outcome: None,
                callbacks: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// A promise that has already fired successfully with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.fire(Ok(value));
        promise
    }

    /// A promise that has already fired with the failure `err`.
    pub fn rejected(err: E) -> Self {
        let promise = Self::new();
        promise.fire(Err(err));
        promise
    }

    /// Adds `continuation` to the delivery list.
    ///
    /// If the promise has already fired, `continuation` runs immediately,
    /// synchronously, with a clone of the captured outcome. Otherwise it is
    /// queued and will run during [`fire`](Promise::fire), after every
    /// continuation registered before it.
    pub fn register<F>(&self, continuation: F) -> CallbackId
    where
        F: FnOnce(Result<T, E>) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = CallbackId(inner.next_id);
        inner.next_id += 1;
        if let Some(outcome) = inner.outcome.clone() {
            drop(inner);
            continuation(outcome);
        } else {
            inner.callbacks.push((id, Box::new(continuation)));
        }
        id
    }

    /// Removes a still-pending continuation.
    ///
    /// Returns `true` if the continuation was found and will no longer be
    /// invoked. After the promise has fired every continuation has already
    /// run, so removal returns `false` and has no effect.
    pub fn unregister(&self, id: CallbackId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.callbacks.len();
        inner.callbacks.retain(|(callback_id, _)| *callback_id != id);
        before != inner.callbacks.len()
    }

    /// Resolves the promise exactly once.
    ///
    /// The first call captures `outcome` and invokes every registered
    /// continuation in registration order, in-line on the calling thread.
    /// Later calls are silently discarded and return `false`.
    ///
    /// Continuations may re-enter the promise: registering during delivery
    /// replays immediately, firing again is discarded, and unregistering
    /// finds nothing left to remove.
    pub fn fire(&self, outcome: Result<T, E>) -> bool {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                trace!("fire on a settled promise discarded");
                return false;
            }
            inner.outcome = Some(outcome.clone());
            std::mem::take(&mut inner.callbacks)
        };
        trace!(continuations = callbacks.len(), "promise fired");
        for (_, callback) in callbacks {
            callback(outcome.clone());
        }
        true
    }

    /// Whether the promise has fired.
    pub fn fired(&self) -> bool {
        self.inner.borrow().outcome.is_some()
    }

    /// A clone of the captured outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        self.inner.borrow().outcome.clone()
    }

    /// Mints the producing side of this promise.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    ///
    /// let reply: Promise<String, String> = Promise::new();
    /// let done = reply.completion();
    /// reply.register(|outcome| assert_eq!(outcome.unwrap(), "pong"));
    /// done.resolve("pong".into());
    /// ```
    pub fn completion(&self) -> Completion<T, E> {
        Completion {
            promise: self.clone(),
        }
    }
}

/// The producing side of a [`Promise`].
///
/// A `Completion` is consumed by use, so each handle settles its promise at
/// most once; the promise itself additionally discards any fire after the
/// first, so several outstanding handles cannot race each other into a
/// second delivery.
pub struct Completion<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("promise", &self.promise)
            .finish()
    }
}

impl<T, E> Completion<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Fires the promise with a success.
    pub fn resolve(self, value: T) {
        self.promise.fire(Ok(value));
    }

    /// Fires the promise with a failure.
    pub fn reject(self, err: E) {
        self.promise.fire(Err(err));
    }

    /// Fires the promise with an outcome already in hand.
    pub fn settle(self, outcome: Result<T, E>) {
        self.promise.fire(outcome);
    }
}
