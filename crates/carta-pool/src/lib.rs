//! A bounded worker pool that hands results back in submission order.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Jobs fan out over `threads` workers through a bounded queue; results come
/// back through [`WorkerPool::get`] strictly in the order the jobs were
/// given, buffering out-of-order completions. The bound on in-flight jobs
/// (`4 x threads`) is what caps the memory held by undelivered results.
pub struct WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    job_tx: Option<Sender<(u64, J)>>,
    res_rx: Receiver<(u64, R)>,
    handles: Vec<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    next_seq: u64,
    next_out: u64,
    stash: HashMap<u64, R>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F>(threads: usize, work: F) -> Self
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let threads = threads.max(1);
        let (job_tx, job_rx) = bounded::<(u64, J)>(threads * 4);
        let (res_tx, res_rx) = bounded::<(u64, R)>(threads * 4);
        let work = Arc::new(work);
        let stop = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let job_rx = job_rx.clone();
            let res_tx = res_tx.clone();
            let work = Arc::clone(&work);
            let stop = Arc::clone(&stop);
            handles.push(thread::spawn(move || {
                while let Ok((seq, job)) = job_rx.recv() {
                    if stop.load(Ordering::Acquire) {
                        continue;
                    }
                    let out = work(job);
                    if res_tx.send((seq, out)).is_err() {
                        break;
                    }
                }
            }));
        }

        Self {
            job_tx: Some(job_tx),
            res_rx,
            handles,
            stop,
            next_seq: 0,
            next_out: 0,
            stash: HashMap::new(),
        }
    }

    /// Submit one job. Blocks while the in-flight bound is reached.
    pub fn give(&mut self, job: J) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let tx = self.job_tx.as_ref().expect("pool already joined");
        // The send fails only when every worker is gone, which only a
        // panicking worker closure can cause.
        if tx.send((seq, job)).is_err() {
            panic!("worker pool lost all workers");
        }
    }

    /// Number of jobs given but not yet returned by [`WorkerPool::get`].
    pub fn outstanding(&self) -> u64 {
        self.next_seq - self.next_out
    }

    /// Receive the next result in submission order. Blocks until the worker
    /// for that submission finishes. Must not be called more often than
    /// [`WorkerPool::give`].
    pub fn get(&mut self) -> R {
        loop {
            if let Some(r) = self.stash.remove(&self.next_out) {
                self.next_out += 1;
                return r;
            }
            match self.res_rx.recv() {
                Ok((seq, r)) => {
                    self.stash.insert(seq, r);
                }
                Err(_) => panic!("worker pool lost all workers"),
            }
        }
    }

    /// Signal that no more jobs are coming, discard whatever has not been
    /// collected, and wait for the workers to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.job_tx.take();
        self.stash.clear();
        // Keep draining while the workers wind down, so none of them stays
        // blocked on a full result queue.
        loop {
            while self.res_rx.try_recv().is_ok() {}
            if self.handles.iter().all(|h| h.is_finished()) {
                break;
            }
            thread::yield_now();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("render worker panicked during shutdown");
            }
        }
    }
}

impl<J, R> Drop for WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    fn drop(&mut self) {
        if self.job_tx.is_some() || !self.handles.is_empty() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn results_come_back_in_submission_order() {
        // Early jobs are the slowest, so later ones finish first.
        let mut pool = WorkerPool::new(4, |n: u64| {
            thread::sleep(Duration::from_millis((16 - n) * 3));
            n * 10
        });
        for n in 0..16 {
            pool.give(n);
        }
        for n in 0..16 {
            assert_eq!(pool.get(), n * 10);
        }
        pool.join();
    }

    #[test]
    fn interleaved_give_and_get_keep_order() {
        let mut pool = WorkerPool::new(2, |n: u32| n + 1);
        let mut expect = 0;
        for n in 0..50u32 {
            pool.give(n);
            if pool.outstanding() >= 8 {
                assert_eq!(pool.get(), expect + 1);
                expect += 1;
            }
        }
        while pool.outstanding() > 0 {
            assert_eq!(pool.get(), expect + 1);
            expect += 1;
        }
        pool.join();
    }

    #[test]
    fn join_discards_uncollected_results() {
        let mut pool = WorkerPool::new(2, |n: u32| n);
        for n in 0..8 {
            pool.give(n);
        }
        assert_eq!(pool.get(), 0);
        assert_eq!(pool.get(), 1);
        pool.join();
    }
}
