//! Trailing debounce
//!
//! A [`Debouncer`] collapses a burst of submissions into one execution of the
//! most recently submitted task, run `delay` after the last submission. Every
//! caller that joined the burst gets the outcome of that single execution.
//!
//! Each burst is a *window*. A window opens on the first submission after the
//! debouncer went idle and closes when it fires, is flushed, or is cancelled.
//! One tokio driver task per window sleeps until the window's deadline and
//! re-checks it under the lock, so re-arming never spawns a second timer.

use crate::config::DebounceConfig;
use crate::error::DebounceError;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

type Task<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// An open coalescing window
struct Window<T> {
    id: u64,
    /// Latest submitted task; earlier ones were dropped unexecuted
    task: Task<T>,
    /// Callers that joined this window, in submission order
    waiters: Vec<oneshot::Sender<T>>,
    opened_at: Instant,
    deadline: Instant,
    /// Driver sleeping until `deadline`
    timer: Option<JoinHandle<()>>,
}

impl<T> Window<T> {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct State<T> {
    window: Option<Window<T>>,
    next_window_id: u64,
    disposed: bool,
}

impl<T> State<T> {
    /// Decide what the driver of window `id` does next
    fn step(&mut self, id: u64, now: Instant) -> Step<T> {
        let deadline = match &self.window {
            Some(window) if window.id == id => window.deadline,
            _ => return Step::Stop,
        };

        if now < deadline {
            Step::Sleep(deadline)
        } else {
            self.window.take().map_or(Step::Stop, Step::Fire)
        }
    }

    fn close(&mut self) -> Option<Window<T>> {
        let mut window = self.window.take()?;
        window.disarm();
        Some(window)
    }
}

enum Step<T> {
    Sleep(Instant),
    Fire(Window<T>),
    Stop,
}

/// Coalesces bursts of submissions into one execution per quiet period
///
/// Submissions must be made from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// # async fn demo() {
/// use settle_core::Debouncer;
/// use std::time::Duration;
///
/// let debouncer = Debouncer::new(Duration::from_millis(100));
/// let first = debouncer.submit(|| async { "stale" });
/// let second = debouncer.submit(|| async { "fresh" });
///
/// assert_eq!(first.await, Ok("fresh"));
/// assert_eq!(second.await, Ok("fresh"));
/// # }
/// ```
pub struct Debouncer<T> {
    config: DebounceConfig,
    state: Arc<Mutex<State<T>>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + 'static,
{
    /// Create a pure trailing debouncer with the given quiet period
    pub fn new(delay: Duration) -> Self {
        Self::from_config(&DebounceConfig::new(delay))
    }

    /// Create a debouncer from a config (delay plus optional max wait)
    pub fn from_config(config: &DebounceConfig) -> Self {
        Self {
            config: *config,
            state: Arc::new(Mutex::new(State {
                window: None,
                next_window_id: 0,
                disposed: false,
            })),
        }
    }

    /// Submit an async task
    ///
    /// Replaces any pending task and restarts the countdown. The returned
    /// future settles once the window fires, with the value of whichever task
    /// was submitted last.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime while no window is open.
    pub fn submit<F, Fut>(&self, task: F) -> Debounced<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.submit_windowed(move |_| task)
    }

    /// Submit a synchronous task
    pub fn submit_sync<F>(&self, task: F) -> Debounced<T>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.submit(move || std::future::ready(task()))
    }

    /// Submit a task built from the id of the window it joins
    ///
    /// `make` runs under the state lock and must not touch this debouncer.
    pub(crate) fn submit_windowed<M, F, Fut>(&self, make: M) -> Debounced<T>
    where
        M: FnOnce(u64) -> F,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let now = Instant::now();
        let mut state = self.state.lock();

        if state.disposed {
            trace!("submission after dispose rejected");
            return Debounced::disposed();
        }

        let id = match &state.window {
            Some(window) => window.id,
            None => state.next_window_id,
        };
        let make_task = make(id);
        let task: Task<T> = Box::new(move || Box::pin(make_task()));
        let (tx, rx) = oneshot::channel();

        match state.window.as_mut() {
            Some(window) => {
                window.task = task;
                window.waiters.push(tx);
                window.deadline = self.deadline(window.opened_at, now);
                trace!(window = id, callers = window.waiters.len(), "debounce window re-armed");
            }
            None => {
                state.next_window_id += 1;
                let timer = tokio::spawn(drive(Arc::downgrade(&self.state), id));
                state.window = Some(Window {
                    id,
                    task,
                    waiters: vec![tx],
                    opened_at: now,
                    deadline: self.deadline(now, now),
                    timer: Some(timer),
                });
                trace!(window = id, delay = ?self.config.delay(), "debounce window opened");
            }
        }

        Debounced {
            window_id: Some(id),
            rx: Some(rx),
        }
    }

    /// Fire the pending window now instead of waiting for its deadline
    ///
    /// Returns `false` if nothing was pending.
    pub fn flush(&self) -> bool {
        let window = self.state.lock().close();

        match window {
            Some(window) => {
                debug!(window = window.id, "debounce window flushed");
                tokio::spawn(run(window));
                true
            }
            None => false,
        }
    }

    fn deadline(&self, opened_at: Instant, now: Instant) -> Instant {
        let trailing = now + self.config.delay();
        match self.config.max_wait() {
            Some(max_wait) => trailing.min(opened_at + max_wait),
            None => trailing,
        }
    }
}

impl<T> Debouncer<T> {
    /// Drop the pending task without running it
    ///
    /// Callers waiting on the cancelled window observe
    /// [`DebounceError::Cancelled`]. Executions already running are not
    /// affected. Returns `false` if nothing was pending.
    pub fn cancel(&self) -> bool {
        self.cancel_window().is_some()
    }

    /// Cancel the pending window, returning its id
    pub(crate) fn cancel_window(&self) -> Option<u64> {
        let window = self.state.lock().close()?;
        debug!(window = window.id, callers = window.waiters.len(), "debounce window cancelled");
        Some(window.id)
    }

    /// Cancel any pending window and refuse all later submissions
    pub fn dispose(&self) {
        self.dispose_window();
    }

    /// Dispose, returning the id of the window this closed
    ///
    /// Windows that already fired or were flushed are not touched.
    pub(crate) fn dispose_window(&self) -> Option<u64> {
        let window = {
            let mut state = self.state.lock();
            if state.disposed {
                return None;
            }
            state.disposed = true;
            state.close()
        };

        debug!(
            cancelled = window.as_ref().map(|w| w.waiters.len()).unwrap_or(0),
            "debouncer disposed"
        );
        window.map(|w| w.id)
    }

    /// Whether a window is armed and waiting to fire
    pub fn is_pending(&self) -> bool {
        self.state.lock().window.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn delay(&self) -> Duration {
        self.config.delay()
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.config.max_wait()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Debouncer")
            .field("config", &self.config)
            .field("window", &state.window.as_ref().map(|w| w.id))
            .field("disposed", &state.disposed)
            .finish()
    }
}

/// Sleep until the window's deadline, following re-arms, then fire it
async fn drive<T>(state: Weak<Mutex<State<T>>>, id: u64)
where
    T: Clone + Send + 'static,
{
    loop {
        let Some(shared) = state.upgrade() else {
            return;
        };
        let step = shared.lock().step(id, Instant::now());
        drop(shared);

        match step {
            Step::Sleep(deadline) => tokio::time::sleep_until(deadline).await,
            Step::Fire(window) => {
                debug!(window = id, callers = window.waiters.len(), "debounce window fired");
                run(window).await;
                return;
            }
            Step::Stop => return,
        }
    }
}

/// Execute the window's task and hand its value to every caller
async fn run<T>(window: Window<T>)
where
    T: Clone + Send + 'static,
{
    let Window {
        id, task, mut waiters, ..
    } = window;

    let value = task().await;
    trace!(window = id, callers = waiters.len(), "debounced task completed");

    if let Some(last) = waiters.pop() {
        for waiter in waiters {
            let _ = waiter.send(value.clone());
        }
        let _ = last.send(value);
    }
}

/// Eventual result of a debounced submission
///
/// Resolves to `Ok` with the value of the task that actually ran for this
/// window, or to a [`DebounceError`] if the window never ran.
pub struct Debounced<T> {
    window_id: Option<u64>,
    rx: Option<oneshot::Receiver<T>>,
}

impl<T> Debounced<T> {
    fn disposed() -> Self {
        Self {
            window_id: None,
            rx: None,
        }
    }

    /// Id of the window this submission joined
    ///
    /// Submissions sharing an id settle to the same outcome. `None` if the
    /// debouncer was already disposed.
    pub fn window_id(&self) -> Option<u64> {
        self.window_id
    }
}

impl<T> Future for Debounced<T> {
    type Output = Result<T, DebounceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.as_mut() {
            Some(rx) => Pin::new(rx)
                .poll(cx)
                .map(|result| result.map_err(|_| DebounceError::Cancelled)),
            None => Poll::Ready(Err(DebounceError::Disposed)),
        }
    }
}

impl<T> fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("window_id", &self.window_id)
            .finish_non_exhaustive()
    }
}
