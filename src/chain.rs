//! Sequential composition of callback-style steps over a [`Promise`].
//!
//! A [`Chain`] owns a queue of steps and an output promise. Every firing that
//! reaches the chain — from the upstream promise or from the promise a step
//! produced — drains exactly one step; a failure anywhere abandons the rest
//! of the queue and delivers that failure to the output unchanged.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::promise::{CallbackId, Completion, Promise};

enum Step<T, E> {
    /// Plain step: receives the forwarded value, returns the promise that
    /// drives the next link. `Err` is a synchronous step failure.
    Chained(Box<dyn FnOnce(T) -> Result<Promise<T, E>, E>>),
    /// Factory-convention step: invoked with the forwarded value and a
    /// completion for an intermediate promise the chain listens on.
    Wrapped(Box<dyn FnOnce(T, Completion<T, E>)>),
}

struct Pipeline<T, E> {
    /// Steps in `then`-call order, taken out by index as they are consumed.
    /// Slots stay behind so indices never shift under a running drain.
    steps: Vec<Option<Step<T, E>>>,
    next: usize,
    output: Promise<T, E>,
}

/// A linear pipeline of steps derived from an upstream [`Promise`].
///
/// Built with [`Promise::then`] / [`Promise::then_with`]; further `then`
/// calls append to the same queue rather than nesting, so
/// `a.then(f).then(g).then(h)` is one pipeline. The chain's output is itself
/// a promise: observe it with [`register`](Chain::register) or keep a handle
/// via [`promise`](Chain::promise).
///
/// # Examples
///
/// ```
/// use promise_chain::{promise, Completion, Promise};
///
/// promise(|done: Completion<i32, String>| done.resolve(1))
///     .then(|n| Ok(Promise::resolved(n + 1)))
///     .then(|n| Ok(Promise::resolved(n * 10)))
///     .register(|outcome| assert_eq!(outcome, Ok(20)));
/// ```
pub struct Chain<T, E> {
    pipeline: Rc<RefCell<Pipeline<T, E>>>,
}

impl<T, E> fmt::Debug for Chain<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pipeline = self.pipeline.borrow();
        f.debug_struct("Chain")
            .field("queued_steps", &(pipeline.steps.len() - pipeline.next))
            .field("output", &pipeline.output)
            .finish()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Starts a chain driven by this promise.
    ///
    /// `step` runs when this promise fires successfully, receiving the
    /// success value; it returns the promise whose firing resumes the chain.
    /// Returning `Err` fails the chain at this step. If this promise fires
    /// with a failure, the step never runs and the failure goes straight to
    /// the chain's output.
    pub fn then<F>(&self, step: F) -> Chain<T, E>
    where
        F: FnOnce(T) -> Result<Promise<T, E>, E> + 'static,
    {
        Chain::start(self, Step::Chained(Box::new(step)))
    }

    /// Starts a chain whose first step is a callback-style operation with
    /// bound arguments, invoked through the factory convention:
    /// `step(args, value, completion)`.
    pub fn then_with<A, F>(&self, step: F, args: A) -> Chain<T, E>
    where
        A: 'static,
        F: FnOnce(A, T, Completion<T, E>) + 'static,
    {
        Chain::start(
            self,
            Step::Wrapped(Box::new(move |value, done| step(args, value, done))),
        )
    }
}

impl<T, E> Chain<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn start(upstream: &Promise<T, E>, step: Step<T, E>) -> Self {
        let pipeline = Rc::new(RefCell::new(Pipeline {
            steps: vec![Some(step)],
            next: 0,
            output: Promise::new(),
        }));
        let driver = Rc::clone(&pipeline);
        upstream.register(move |outcome| advance(&driver, outcome));
        Chain { pipeline }
    }

    /// Appends a plain step to the pipeline.
    ///
    /// Once the chain has fired it is terminal: a late step runs immediately
    /// with the captured success value, exactly like a late registration, and
    /// whatever promise it produces is ignored by the settled chain. On a
    /// captured failure there is no value to hand over and the step is
    /// dropped.
    pub fn then<F>(self, step: F) -> Self
    where
        F: FnOnce(T) -> Result<Promise<T, E>, E> + 'static,
    {
        self.push(Step::Chained(Box::new(step)))
    }

    /// Appends a callback-style step with bound arguments, as in
    /// [`Promise::then_with`].
    pub fn then_with<A, F>(self, step: F, args: A) -> Self
    where
        A: 'static,
        F: FnOnce(A, T, Completion<T, E>) + 'static,
    {
        self.push(Step::Wrapped(Box::new(move |value, done| {
            step(args, value, done)
        })))
    }

    fn push(self, step: Step<T, E>) -> Self {
        let settled = self.pipeline.borrow().output.outcome();
        match settled {
            None => self.pipeline.borrow_mut().steps.push(Some(step)),
            Some(Ok(value)) => dispatch(&self.pipeline, step, value),
            Some(Err(_)) => {}
        }
        self
    }

    /// Registers a terminal observer on the chain's output promise.
    pub fn register<F>(&self, observer: F) -> CallbackId
    where
        F: FnOnce(Result<T, E>) + 'static,
    {
        self.promise().register(observer)
    }

    /// Removes a pending terminal observer.
    pub fn unregister(&self, id: CallbackId) -> bool {
        self.promise().unregister(id)
    }

    /// The output promise: fires when the pipeline is exhausted or a failure
    /// short-circuits it.
    pub fn promise(&self) -> Promise<T, E> {
        self.pipeline.borrow().output.clone()
    }
}

/// Moves the chain along one link. Runs each time the upstream promise or a
/// step's produced promise fires into the pipeline.
fn advance<T, E>(pipeline: &Rc<RefCell<Pipeline<T, E>>>, outcome: Result<T, E>)
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let output = {
        let pipeline = pipeline.borrow();
        // Terminal: nothing runs after the output has fired.
        if pipeline.output.fired() {
            return;
        }
        pipeline.output.clone()
    };

    let value = match outcome {
        Err(err) => {
            trace!("chain short-circuiting on failure");
            output.fire(Err(err));
            return;
        }
        Ok(value) => value,
    };

    let consumed = {
        let mut pipeline = pipeline.borrow_mut();
        if pipeline.next < pipeline.steps.len() {
            let index = pipeline.next;
            pipeline.next += 1;
            pipeline.steps[index].take().map(|step| (index, step))
        } else {
            None
        }
    };

    match consumed {
        None => {
            output.fire(Ok(value));
        }
        Some((index, step)) => {
            trace!(step = index, "dispatching chain step");
            dispatch(pipeline, step, value);
        }
    }
}

/// Invokes one step and wires its produced promise back into the drain.
fn dispatch<T, E>(pipeline: &Rc<RefCell<Pipeline<T, E>>>, step: Step<T, E>, value: T)
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    match step {
        Step::Chained(step) => match step(value) {
            Ok(produced) => {
                let driver = Rc::clone(pipeline);
                produced.register(move |outcome| advance(&driver, outcome));
            }
            Err(err) => advance(pipeline, Err(err)),
        },
        Step::Wrapped(step) => {
            let intermediate = Promise::new();
            let driver = Rc::clone(pipeline);
            intermediate.register(move |outcome| advance(&driver, outcome));
            step(value, intermediate.completion());
        }
    }
}
