//! Bridge from a [`Promise`] to `std::future::Future`, for code that wants
//! to `.await` an outcome on a single-threaded executor instead of
//! registering a continuation.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::promise::Promise;

struct Shared<T, E> {
    outcome: Option<Result<T, E>>,
    waker: Option<Waker>,
}

/// A future resolving to the outcome of the promise it was minted from.
///
/// Several waiters may observe one promise; each receives its own clone of
/// the outcome.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use promise_chain::Promise;
///
/// let greeting: Promise<String, String> = Promise::new();
/// let waiter = greeting.waiter();
/// greeting.fire(Ok("hello".into()));
/// assert_eq!(block_on(waiter), Ok("hello".to_string()));
/// ```
pub struct Waiter<T, E> {
    shared: Rc<RefCell<Shared<T, E>>>,
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Mints a future that completes when this promise fires.
    pub fn waiter(&self) -> Waiter<T, E> {
        let shared = Rc::new(RefCell::new(Shared {
            outcome: None,
            waker: None,
        }));
        let delivery = Rc::clone(&shared);
        self.register(move |outcome| {
            let waker = {
                let mut shared = delivery.borrow_mut();
                shared.outcome = Some(outcome);
                shared.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        });
        Waiter { shared }
    }
}

impl<T, E> Future for Waiter<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.borrow_mut();
        match shared.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                shared.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
