//! Trailing-edge debounce: only the last trigger inside the quiet window fires.
//!
//! Each trigger aborts the pending timer task and spawns a new one, which delivers its
//! value over an mpsc channel once the window elapses. An aborted timer may already have
//! sent on another worker thread, so deliveries carry the trigger generation and [`tick`]
//! discards any that a later trigger superseded.
//!
//! [`tick`]: Debouncer::tick

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

pub struct Debouncer<T> {
    window: Duration,
    tx: mpsc::UnboundedSender<(u64, T)>,
    rx: mpsc::UnboundedReceiver<(u64, T)>,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            window,
            tx,
            rx,
            pending: None,
            generation: 0,
        }
    }

    /// (Re)starts the quiet window with `value` as the payload.
    pub fn trigger(&mut self, value: T) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send((generation, value));
        }));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the next fired value. `None` when nothing is scheduled or buffered.
    pub async fn tick(&mut self) -> Option<T> {
        loop {
            let (generation, value) = match self.rx.try_recv() {
                Ok(delivery) => delivery,
                Err(_) => {
                    self.pending.as_ref()?;
                    self.rx.recv().await?
                }
            };
            if generation == self.generation {
                self.pending = None;
                return Some(value);
            }
            trace!("Dropping debounced value from superseded trigger {generation}");
        }
    }

    /// Drops the pending timer and anything it already delivered.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation += 1;
        while self.rx.try_recv().is_ok() {}
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_trigger_fires() {
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
        let start = Instant::now();

        for i in 1..=5 {
            debouncer.trigger(i);
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        assert_eq!(debouncer.tick().await, Some(5));
        assert!(start.elapsed() >= Duration::from_millis(400 + 300));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.tick().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_fire_separately() {
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);

        debouncer.trigger("a");
        assert_eq!(debouncer.tick().await, Some("a"));
        debouncer.trigger("b");
        assert_eq!(debouncer.tick().await, Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_delivery_is_dropped() {
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
        debouncer.trigger(1);
        debouncer.trigger(2);
        // The first timer sent just before its abort landed.
        debouncer.tx.send((1, 1)).unwrap();

        assert_eq!(debouncer.tick().await, Some(2));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.tick().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_value_wins_across_workers() {
        let mut debouncer = Debouncer::new(Duration::from_millis(2));

        for round in 0..20 {
            for i in 0..10 {
                debouncer.trigger(round * 10 + i);
                if i % 3 == 0 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
            assert_eq!(debouncer.tick().await, Some(round * 10 + 9));
            assert_eq!(debouncer.tick().await, None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);
        debouncer.trigger(1);
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(debouncer.tick().await, None);
    }
}
