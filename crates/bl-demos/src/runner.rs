//! Worker threads shared by the demos.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::error::{AppError, AppResult};

/// Longest a worker blocks before looking at its stop flag again.
pub(crate) const POLL: Duration = Duration::from_millis(100);

/// A demo that runs on its own threads until stopped.
pub trait Demo: Send {
    /// Load the peer's sensor state and start the worker threads.
    fn start(&mut self) -> AppResult<()>;

    /// Ask every worker to finish. Returns at once; see
    /// [`wait_until_done`](Demo::wait_until_done).
    fn stop(&self);

    /// Join the workers, returning the first error any of them hit.
    fn wait_until_done(&mut self) -> AppResult<()>;
}

/// Join every demo, even after one reports an error, and return the first
/// error seen.
pub fn wait_all(demos: &mut [Box<dyn Demo>]) -> AppResult<()> {
    let mut first_error = None;
    for demo in demos.iter_mut() {
        if let Err(err) = demo.wait_until_done() {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Cooperative cancellation shared by one demo's workers.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Block until `ready` holds, calling `wait` between checks.
    ///
    /// `wait` should return within [`POLL`]. Returns false if the flag was
    /// raised first.
    pub(crate) fn wait_until(
        &self,
        mut ready: impl FnMut() -> bool,
        mut wait: impl FnMut(),
    ) -> bool {
        loop {
            if ready() {
                return true;
            }
            if self.is_stopped() {
                return false;
            }
            wait();
        }
    }

    /// Sleep for `duration` in slices. Returns false if stopped meanwhile.
    pub(crate) fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(POLL.min(deadline - now));
        }
    }
}

/// Named worker threads, joined together.
#[derive(Debug, Default)]
pub(crate) struct Workers {
    handles: Vec<(String, JoinHandle<AppResult<()>>)>,
}

impl Workers {
    pub(crate) fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Spawn `work` on a thread named `name`. An error it returns raises
    /// `stop` so the other workers wind down too.
    pub(crate) fn spawn<F>(&mut self, name: impl Into<String>, stop: &StopFlag, work: F) -> AppResult<()>
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        let name = name.into();
        let stop = stop.clone();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                debug!(worker = %thread_name, "Worker started");
                let result = work();
                if let Err(err) = &result {
                    error!(worker = %thread_name, %err, "Worker failed");
                    stop.stop();
                }
                result
            })
            .map_err(|source| AppError::Spawn {
                name: name.clone(),
                source,
            })?;
        self.handles.push((name, handle));
        Ok(())
    }

    /// Join every worker. All are joined even after a failure.
    pub(crate) fn join_all(&mut self) -> AppResult<()> {
        let mut first_error = None;
        for (name, handle) in self.handles.drain(..) {
            let result = handle
                .join()
                .unwrap_or_else(|_| Err(AppError::WorkerPanicked(name)));
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn wait_until_stops_on_flag() {
        let stop = StopFlag::new();
        let polls = AtomicUsize::new(0);
        let finished = stop.wait_until(
            || false,
            || {
                if polls.fetch_add(1, Ordering::SeqCst) == 2 {
                    stop.stop();
                }
            },
        );
        assert!(!finished);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn wait_until_prefers_ready_over_stop() {
        let stop = StopFlag::new();
        stop.stop();
        assert!(stop.wait_until(|| true, || unreachable!()));
    }

    #[test]
    fn sleep_is_cut_short_by_stop() {
        let stop = StopFlag::new();
        assert!(stop.sleep(Duration::from_millis(1)));
        stop.stop();
        let started = Instant::now();
        assert!(!stop.sleep(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn failing_worker_stops_siblings_and_is_reported() {
        let stop = StopFlag::new();
        let mut workers = Workers::default();
        let watched = stop.clone();
        workers
            .spawn("waiter", &stop, move || {
                watched.wait_until(|| false, || thread::sleep(POLL));
                Ok(())
            })
            .unwrap();
        workers
            .spawn("failer", &stop, || Err(AppError::Validation("boom".into())))
            .unwrap();

        assert!(matches!(workers.join_all(), Err(AppError::Validation(_))));
        assert!(stop.is_stopped());
        assert!(workers.is_empty());
    }

    struct Finished {
        result: Option<AppResult<()>>,
        joined: Arc<AtomicUsize>,
    }

    impl Demo for Finished {
        fn start(&mut self) -> AppResult<()> {
            Ok(())
        }

        fn stop(&self) {}

        fn wait_until_done(&mut self) -> AppResult<()> {
            self.joined.fetch_add(1, Ordering::SeqCst);
            self.result.take().unwrap_or(Ok(()))
        }
    }

    #[test]
    fn wait_all_joins_every_demo_and_keeps_first_error() {
        let joined = Arc::new(AtomicUsize::new(0));
        let demo = |result: AppResult<()>| -> Box<dyn Demo> {
            Box::new(Finished {
                result: Some(result),
                joined: joined.clone(),
            })
        };
        let mut demos = vec![
            demo(Err(AppError::Validation("first".into()))),
            demo(Err(AppError::WorkerPanicked("second".into()))),
            demo(Ok(())),
        ];

        match wait_all(&mut demos) {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "first"),
            other => panic!("Expected the first error, got {other:?}"),
        }
        assert_eq!(joined.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn panicking_worker_is_reported_by_name() {
        let stop = StopFlag::new();
        let mut workers = Workers::default();
        workers.spawn("doomed", &stop, || panic!("lost")).unwrap();
        match workers.join_all() {
            Err(AppError::WorkerPanicked(name)) => assert_eq!(name, "doomed"),
            other => panic!("Expected WorkerPanicked, got {other:?}"),
        }
    }
}
