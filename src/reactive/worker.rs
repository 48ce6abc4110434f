use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use super::graph::{Outcome, Plan};

/// Called after each finished plan, e.g. to request a repaint.
pub type Waker = Box<dyn Fn() + Send>;

// ---------------------------------------------------------------------------
// Background recomputation
// ---------------------------------------------------------------------------

/// A single thread that runs plans in submission order.
///
/// When several plans queue up while one is running, only the newest is run:
/// the older ones belong to superseded generations and their results would
/// be discarded anyway.
pub struct Worker<V> {
    jobs: Option<Sender<Plan<V>>>,
    results: Receiver<Outcome<V>>,
    handle: Option<JoinHandle<()>>,
}

impl<V: Clone + Send + 'static> Worker<V> {
    pub fn spawn(waker: Option<Waker>) -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Plan<V>>();
        let (result_tx, result_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("recompute".into())
            .spawn(move || {
                while let Ok(mut plan) = job_rx.recv() {
                    while let Ok(newer) = job_rx.try_recv() {
                        log::debug!(
                            "skipping plan for generation {} (superseded by {})",
                            plan.generation,
                            newer.generation
                        );
                        plan = newer;
                    }
                    let outcome = plan.run();
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                    if let Some(wake) = &waker {
                        wake();
                    }
                }
                log::debug!("recompute worker stopped");
            })?;

        Ok(Worker {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a plan. Returns it back if the worker thread has gone away.
    pub fn submit(&self, plan: Plan<V>) -> Result<(), Plan<V>> {
        match &self.jobs {
            Some(tx) => tx.send(plan).map_err(|e| e.0),
            None => Err(plan),
        }
    }

    /// Next finished outcome, without blocking.
    pub fn try_recv(&self) -> Option<Outcome<V>> {
        match self.results.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next outcome arrives.
    pub fn recv(&self) -> Option<Outcome<V>> {
        self.results.recv().ok()
    }
}

impl<V> Drop for Worker<V> {
    fn drop(&mut self) {
        // Closing the job channel ends the thread's loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("recompute worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::graph::{Graph, fingerprint};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn worker_results_apply_to_graph() {
        let mut g: Graph<i64> = Graph::new(4);
        let a = g.source("a");
        let sq = g.derived("square", &[a], |v| v[0] * v[0]);
        g.set(a, 7, fingerprint(&7));

        let worker = Worker::spawn(None).unwrap();
        worker.submit(g.plan().unwrap()).unwrap();
        let outcome = worker.recv().unwrap();
        assert!(g.apply(outcome));
        assert_eq!(g.get(sq), Some(&49));
    }

    #[test]
    fn last_input_wins() {
        let mut g: Graph<i64> = Graph::new(4);
        let a = g.source("a");
        let id = g.derived("id", &[a], |v| v[0]);

        let worker = Worker::spawn(None).unwrap();
        for v in 1..=5 {
            g.set(a, v, fingerprint(&v));
            worker.submit(g.plan().unwrap()).unwrap();
        }

        // Whatever subset of plans actually ran, only the last one sticks.
        let mut applied = 0;
        while g.is_busy() {
            let outcome = worker.recv().unwrap();
            if g.apply(outcome) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(g.get(id), Some(&5));
    }

    #[test]
    fn waker_fires_per_outcome() {
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let worker: Worker<i64> =
            Worker::spawn(Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })))
            .unwrap();

        let mut g: Graph<i64> = Graph::new(4);
        let a = g.source("a");
        g.derived("neg", &[a], |v| -v[0]);
        g.set(a, 3, fingerprint(&3));
        worker.submit(g.plan().unwrap()).unwrap();
        assert!(g.apply(worker.recv().unwrap()));
        drop(worker);
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }
}
