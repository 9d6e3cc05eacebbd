//! Background loads with last-request-wins semantics.
//!
//! Every `request` bumps a generation counter and spawns a worker thread.
//! Workers report back over a channel tagged with their generation; `poll`
//! only accepts the result of the latest request, so a slow earlier fetch
//! can never overwrite the view of a newer selection.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use crate::error::DatasetError;

/// State of the most recent request.
#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Failed(DatasetError),
    Ready(T),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

pub struct Loader<T> {
    generation: u64,
    tx: Sender<(u64, Result<T, DatasetError>)>,
    rx: Receiver<(u64, Result<T, DatasetError>)>,
    state: LoadState<T>,
}

impl<T: Send + 'static> Loader<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            tx,
            rx,
            state: LoadState::Idle,
        }
    }

    /// Start a load; any in-flight load becomes stale.
    pub fn request<F>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> Result<T, DatasetError> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        thread::spawn(move || {
            // The receiver may be gone if the UI exited; nothing to do then.
            let _ = tx.send((generation, job()));
        });
        self.state = LoadState::Loading;
        generation
    }

    /// Drain finished jobs. Returns `true` when the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok((generation, result)) => {
                    if generation != self.generation {
                        tracing::debug!(generation, latest = self.generation, "dropping stale load result");
                        continue;
                    }
                    self.state = match result {
                        Ok(value) => LoadState::Ready(value),
                        Err(err) => LoadState::Failed(err),
                    };
                    changed = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return changed,
            }
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }
}

impl<T: Send + 'static> Default for Loader<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    fn wait_until_settled<T: Send + 'static>(loader: &mut Loader<T>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            loader.poll();
            if !loader.state().is_loading() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("loader did not settle");
    }

    #[test]
    fn stale_result_is_dropped() {
        let mut loader: Loader<&'static str> = Loader::new();

        // First request blocks until released, after the second one finished.
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let (done_tx, done_rx) = std_mpsc::channel::<()>();
        loader.request(move || {
            let _ = release_rx.recv();
            let _ = done_tx.send(());
            Ok("old")
        });
        loader.request(|| Ok("new"));
        assert_eq!(loader.generation(), 2);

        wait_until_settled(&mut loader);
        assert_eq!(loader.state().ready(), Some(&"new"));

        release_tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        thread::sleep(Duration::from_millis(20));
        loader.poll();
        assert_eq!(loader.state().ready(), Some(&"new"));
    }

    #[test]
    fn failure_is_reported() {
        let mut loader: Loader<()> = Loader::default();
        loader.request(|| Err(DatasetError::Empty));
        wait_until_settled(&mut loader);
        assert!(matches!(loader.state(), LoadState::Failed(DatasetError::Empty)));
    }
}
