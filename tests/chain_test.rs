//! End-to-end pipeline tests driving deferred completions through a small
//! simulated event queue, the way an event-driven caller would.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use promise_chain::{promise, promise_with, Completion, Promise};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum PipelineError {
    #[error("step {0} failed")]
    StepFailed(usize),
    #[error("not a file: {0}")]
    NotAFile(String),
}

/// Single-threaded stand-in for an event loop: operations park their
/// completions here and a later `run` turn settles them.
#[derive(Default)]
struct EventQueue {
    pending: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl EventQueue {
    fn defer(&self, action: impl FnOnce() + 'static) {
        self.pending.borrow_mut().push_back(Box::new(action));
    }

    fn run(&self) {
        loop {
            let action = self.pending.borrow_mut().pop_front();
            match action {
                Some(action) => action(),
                None => break,
            }
        }
    }
}

type Trail = Rc<RefCell<Vec<String>>>;

/// A pipeline step that checks it received its predecessor's value, then
/// completes on a later queue turn.
fn deferred_step(
    k: usize,
    queue: &Rc<EventQueue>,
    trail: &Trail,
) -> impl FnOnce(String) -> Result<Promise<String, PipelineError>, PipelineError> {
    let queue = Rc::clone(queue);
    let trail = Rc::clone(trail);
    move |value| {
        trail.borrow_mut().push(format!("step {k} called"));
        assert_eq!(value, format!("value from step {}", k - 1));
        let handle = Promise::new();
        let done = handle.completion();
        let trail = Rc::clone(&trail);
        queue.defer(move || {
            trail.borrow_mut().push(format!("step {k} returning"));
            done.resolve(format!("value from step {k}"));
        });
        Ok(handle)
    }
}

#[test]
fn five_deferred_steps_run_strictly_in_order() {
    let queue = Rc::new(EventQueue::default());
    let trail: Trail = Rc::default();

    let source: Promise<String, PipelineError> = Promise::new();
    let chain = source
        .then(deferred_step(1, &queue, &trail))
        .then(deferred_step(2, &queue, &trail))
        .then(deferred_step(3, &queue, &trail))
        .then(deferred_step(4, &queue, &trail))
        .then(deferred_step(5, &queue, &trail));

    let observed = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&observed);
    chain.register(move |outcome| *sink.borrow_mut() = Some(outcome));

    source.fire(Ok("value from step 0".into()));
    queue.run();

    let expected: Vec<String> = (1..=5)
        .flat_map(|k| [format!("step {k} called"), format!("step {k} returning")])
        .collect();
    assert_eq!(*trail.borrow(), expected);
    assert_eq!(
        *observed.borrow(),
        Some(Ok("value from step 5".to_string()))
    );
}

#[test]
fn failure_at_step_four_never_reaches_step_five() {
    let queue = Rc::new(EventQueue::default());
    let trail: Trail = Rc::default();

    let failing_step = {
        let queue = Rc::clone(&queue);
        move |_value: String| {
            let handle: Promise<String, PipelineError> = Promise::new();
            let done = handle.completion();
            queue.defer(move || done.reject(PipelineError::StepFailed(4)));
            Ok(handle)
        }
    };

    let fifth_ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fifth_ran);

    let source: Promise<String, PipelineError> = Promise::new();
    let chain = source
        .then(deferred_step(1, &queue, &trail))
        .then(deferred_step(2, &queue, &trail))
        .then(deferred_step(3, &queue, &trail))
        .then(failing_step)
        .then(move |value: String| {
            flag.set(true);
            Ok(Promise::resolved(value))
        });

    let observed = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&observed);
    chain.register(move |outcome| *sink.borrow_mut() = Some(outcome));

    source.fire(Ok("value from step 0".into()));
    queue.run();

    assert!(!fifth_ran.get());
    assert_eq!(
        *observed.borrow(),
        Some(Err(PipelineError::StepFailed(4)))
    );
}

/// Fake stat: succeeds for anything not ending in '/', like the original
/// file-reading demo this crate grew out of.
fn stat(path: String, done: Completion<String, PipelineError>) {
    if path.ends_with('/') {
        done.reject(PipelineError::NotAFile(path));
    } else {
        done.resolve(format!("stat:{path}"));
    }
}

fn read_file(path: String, _stat: String, done: Completion<String, PipelineError>) {
    done.resolve(format!("contents of {path}"));
}

#[test]
fn stat_then_read_delivers_the_contents() {
    let observed = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&observed);

    promise_with(stat, "notes.txt".to_string())
        .then_with(read_file, "notes.txt".to_string())
        .register(move |outcome| *sink.borrow_mut() = Some(outcome));

    assert_eq!(
        *observed.borrow(),
        Some(Ok("contents of notes.txt".to_string()))
    );
}

#[test]
fn stat_failure_short_circuits_the_read() {
    let read_ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&read_ran);
    let observed = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&observed);

    promise_with(stat, "music/".to_string())
        .then_with(
            move |path: String, stat: String, done| {
                flag.set(true);
                read_file(path, stat, done);
            },
            "music/".to_string(),
        )
        .register(move |outcome| *sink.borrow_mut() = Some(outcome));

    assert!(!read_ran.get());
    assert_eq!(
        *observed.borrow(),
        Some(Err(PipelineError::NotAFile("music/".to_string())))
    );
}

#[test]
fn one_promise_fans_out_to_every_observer_once() {
    let queue = Rc::new(EventQueue::default());
    let seen: Rc<RefCell<Vec<(usize, Result<u32, PipelineError>)>>> = Rc::default();

    let handle = promise(|done: Completion<u32, PipelineError>| {
        queue.defer(move || done.resolve(7));
    });
    for label in 1..=3 {
        let seen = Rc::clone(&seen);
        handle.register(move |outcome| seen.borrow_mut().push((label, outcome)));
    }

    queue.run();
    assert!(!handle.fire(Ok(8)));

    // A straggler registered after the fire still sees the captured outcome.
    let seen_late = Rc::clone(&seen);
    handle.register(move |outcome| seen_late.borrow_mut().push((4, outcome)));

    let expected: Vec<_> = (1..=4).map(|label| (label, Ok(7))).collect();
    assert_eq!(*seen.borrow(), expected);
}
