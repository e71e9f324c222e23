//! Restartable reactive feeds over `tokio::sync::watch` state.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

type View<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

/// Subscriber handle yielding the latest value of a watched state.
///
/// The first `next()` resolves immediately with the current value; later calls
/// wait for the next publish. Intermediate values are coalesced, so a
/// subscriber only ever sees whole snapshots. Dropping the feed unsubscribes.
pub struct Feed<T> {
    rx: watch::Receiver<T>,
    view: Option<View<T>>,
    primed: bool,
}

impl<T: Clone> Feed<T> {
    pub(crate) const fn new(rx: watch::Receiver<T>) -> Self {
        Self {
            rx,
            view: None,
            primed: false,
        }
    }

    pub(crate) fn with_view(
        rx: watch::Receiver<T>,
        view: impl Fn(&T) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            rx,
            view: Some(Arc::new(view)),
            primed: false,
        }
    }

    /// Latest value, marking it as seen.
    pub fn current(&mut self) -> T {
        self.primed = true;
        let value = self.rx.borrow_and_update();
        match &self.view {
            Some(view) => view(&value),
            None => value.clone(),
        }
    }

    /// Next value; `None` once the publisher is gone.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            return Some(self.current());
        }
        self.rx.changed().await.ok()?;
        Some(self.current())
    }

    /// Whether a publish happened since the last `current()`/`next()`.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Independent subscriber over the same state, restarting from the current value.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            view: self.view.clone(),
            primed: false,
        }
    }
}

impl<T> fmt::Debug for Feed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("filtered", &self.view.is_some())
            .field("primed", &self.primed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_next_yields_current_value() {
        let (tx, rx) = watch::channel(1);
        let mut feed = Feed::new(rx);
        assert_eq!(feed.next().await, Some(1));
        tx.send_replace(2);
        assert_eq!(feed.next().await, Some(2));
    }

    #[tokio::test]
    async fn view_is_applied_to_every_value() {
        let (tx, rx) = watch::channel(vec![1, 2, 3, 4]);
        let mut evens = Feed::with_view(rx, |values: &Vec<i32>| {
            values.iter().copied().filter(|v| v % 2 == 0).collect()
        });
        assert_eq!(evens.current(), vec![2, 4]);
        tx.send_replace(vec![6, 7]);
        assert_eq!(evens.next().await, Some(vec![6]));
    }

    #[tokio::test]
    async fn ends_when_publisher_dropped() {
        let (tx, rx) = watch::channel(0);
        let mut feed = Feed::new(rx);
        feed.current();
        drop(tx);
        assert_eq!(feed.next().await, None);
    }

    #[tokio::test]
    async fn restart_sees_current_value_again() {
        let (_tx, rx) = watch::channel(5);
        let mut feed = Feed::new(rx);
        feed.current();
        let mut restarted = feed.restart();
        assert!(!feed.has_changed());
        assert_eq!(restarted.next().await, Some(5));
    }
}
