//! One-shot delayed callback that can be cancelled until it fires.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Pending,
    Fired,
    Cancelled,
}

const POLL_STEP: Duration = Duration::from_millis(10);

/// Fires `on_fire` once after `delay` on a worker thread, unless cancelled
/// first. Dropping the handle cancels it.
pub struct DeferredActivation {
    state: Arc<Mutex<State>>,
}

impl DeferredActivation {
    pub fn schedule<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(Mutex::new(State::Pending));
        let worker_state = Arc::clone(&state);
        thread::spawn(move || {
            let deadline = Instant::now() + delay;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                if let Ok(st) = worker_state.lock() {
                    if *st == State::Cancelled {
                        return;
                    }
                }
                thread::sleep(POLL_STEP.min(deadline - now));
            }
            // The callback runs under the lock so cancel() either wins
            // outright or observes Fired.
            if let Ok(mut st) = worker_state.lock() {
                if *st == State::Pending {
                    *st = State::Fired;
                    on_fire();
                }
            }
        });
        Self { state }
    }

    /// Returns true when this call prevented the activation.
    pub fn cancel(&self) -> bool {
        match self.state.lock() {
            Ok(mut st) if *st == State::Pending => {
                *st = State::Cancelled;
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn has_fired(&self) -> bool {
        self.state
            .lock()
            .map(|st| *st == State::Fired)
            .unwrap_or(false)
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.state
            .lock()
            .map(|st| *st == State::Pending)
            .unwrap_or(false)
    }
}

impl Drop for DeferredActivation {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn fires_once_after_delay() {
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();
        let act = DeferredActivation::schedule(Duration::from_millis(30), move || {
            let _ = tx.send(());
        });
        assert!(act.is_pending());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(act.has_fired());
        assert!(!act.cancel());
    }

    #[test]
    fn cancel_before_deadline_prevents_firing() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let act = DeferredActivation::schedule(Duration::from_millis(200), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(act.cancel());
        thread::sleep(Duration::from_millis(300));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!act.has_fired());
    }

    #[test]
    fn drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        {
            let _act = DeferredActivation::schedule(Duration::from_millis(100), move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        thread::sleep(Duration::from_millis(250));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
