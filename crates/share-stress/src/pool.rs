//! Worker pool for stress and throughput runs.
//!
//! Workers are named OS threads released together through a start gate, so
//! they hit the structure under test at the same time instead of trickling
//! in as they are spawned.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::StressError;

/// A fixed set of worker threads running the same closure.
pub struct WorkerPool<R> {
    name: String,
    handles: Vec<JoinHandle<R>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Spawn `workers` threads named `{name}-{index}`, each running
    /// `work(index)` once all of them exist.
    pub fn spawn<F>(name: &str, workers: usize, work: F) -> Result<Self, StressError>
    where
        F: Fn(usize) -> R + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let gate = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let work = Arc::clone(&work);
            let worker_gate = Arc::clone(&gate);
            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || {
                    while !worker_gate.load(Ordering::Acquire) {
                        thread::yield_now();
                    }
                    work(index)
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(pool = name, index, error = %e, "worker spawn failed");
                    // Let the ones already running finish before reporting.
                    gate.store(true, Ordering::Release);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(StressError::Spawn(e));
                }
            }
        }

        debug!(pool = name, workers, "workers released");
        gate.store(true, Ordering::Release);

        Ok(Self {
            name: name.to_string(),
            handles,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker. Results come back in worker index order.
    ///
    /// All workers are joined even if one panicked; the first panic is
    /// reported.
    pub fn join(self) -> Result<Vec<R>, StressError> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut first_panic = None;

        for (index, handle) in self.handles.into_iter().enumerate() {
            match handle.join() {
                Ok(result) => results.push(result),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(pool = %self.name, index, %message, "worker panicked");
                    first_panic.get_or_insert(StressError::WorkerPanicked {
                        pool: self.name.clone(),
                        index,
                        message,
                    });
                }
            }
        }

        match first_panic {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_in_index_order() {
        let pool = WorkerPool::spawn("square", 4, |i| i * i).unwrap();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.join().unwrap(), vec![0, 1, 4, 9]);
    }

    #[test]
    fn test_thread_names() {
        let pool = WorkerPool::spawn("named", 2, |_| {
            thread::current().name().map(str::to_string)
        })
        .unwrap();
        let names = pool.join().unwrap();
        assert_eq!(
            names,
            vec![Some("named-0".to_string()), Some("named-1".to_string())]
        );
    }

    #[test]
    fn test_panic_is_reported() {
        let pool = WorkerPool::spawn("boom", 3, |i| {
            if i == 1 {
                panic!("worker one failed");
            }
            i
        })
        .unwrap();

        match pool.join() {
            Err(StressError::WorkerPanicked { pool, index, message }) => {
                assert_eq!(pool, "boom");
                assert_eq!(index, 1);
                assert!(message.contains("worker one failed"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_workers_released_together() {
        use std::sync::atomic::AtomicUsize;

        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        // Each worker sees the full count only if none ran before the last
        // spawn; the gate is released after that.
        let pool = WorkerPool::spawn("gate", 4, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            while counter.load(Ordering::SeqCst) < 4 {
                thread::yield_now();
            }
        })
        .unwrap();
        pool.join().unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_empty_pool() {
        let pool = WorkerPool::spawn("none", 0, |i| i).unwrap();
        assert!(pool.is_empty());
        assert!(pool.join().unwrap().is_empty());
    }
}
