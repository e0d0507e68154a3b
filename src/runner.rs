//! Execution strategies for deferred work: inline, thread-per-job, or
//! a fixed worker pool.
use std::fmt;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use log::error;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

#[derive(Debug)]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution error: {}", self.message)
    }
}

struct Worker {
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(receiver: Arc<Mutex<mpsc::Receiver<Message>>>) -> Worker {
        let thread = thread::spawn(move || loop {
            let message = match receiver.lock().unwrap().recv() {
                Ok(message) => message,
                Err(_) => break,
            };
            match message {
                Message::Run(job) => job(),
                Message::Shutdown => break,
            }
        });
        Worker {
            thread: Some(thread),
        }
    }
}

/// A fixed pool of worker threads.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: mpsc::Sender<Message>,
}

impl ThreadPool {
    /// # Arguments
    /// * `size`: number of worker threads, at least one
    pub fn new(size: usize) -> ThreadPool {
        assert!(size > 0);
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..size)
            .map(|_| Worker::new(Arc::clone(&receiver)))
            .collect();
        ThreadPool { workers, sender }
    }

    pub fn execute<F>(&self, f: F) -> Result<(), ExecutionError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Message::Run(Box::new(f)))
            .map_err(|_| ExecutionError::new("worker channel closed"))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.sender.send(Message::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("worker thread panicked");
                }
            }
        }
    }
}

/// A pluggable execution strategy.
///
/// * `0` threads: a new thread per job
/// * `1` thread: run on the calling thread
/// * `n` threads: a pool of `n` workers
pub enum Runner {
    Inline,
    Detached(Vec<Option<thread::JoinHandle<()>>>),
    Pool(ThreadPool),
}

impl Runner {
    pub fn new(n_threads: usize) -> Self {
        match n_threads {
            0 => Runner::Detached(Vec::new()),
            1 => Runner::Inline,
            n => Runner::Pool(ThreadPool::new(n)),
        }
    }

    pub fn run<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Runner::Inline => f(),
            Runner::Detached(threads) => threads.push(Some(thread::spawn(f))),
            Runner::Pool(pool) => {
                if let Err(e) = pool.execute(f) {
                    error!("{}", e);
                }
            }
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Runner::Detached(threads) = self {
            for thread in threads {
                if let Some(thread) = thread.take() {
                    if thread.join().is_err() {
                        error!("detached thread panicked");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn count_jobs(mut runner: Runner, jobs: usize) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..jobs {
            let count = count.clone();
            runner.run(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(runner);
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn test_inline_runner() {
        assert_eq!(count_jobs(Runner::new(1), 4), 4);
    }

    #[test]
    fn test_detached_runner_joins_on_drop() {
        assert_eq!(count_jobs(Runner::new(0), 4), 4);
    }

    #[test]
    fn test_pool_runner() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut runner = Runner::new(3);
            for _ in 0..16 {
                let count = count.clone();
                runner.run(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 16);
    }
}
