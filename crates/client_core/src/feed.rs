//! Live query subscription pushed by the data backend.

use shared::domain::TodoRecord;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Full ordered collection for one owner. `None` until the query resolves.
pub type Snapshot = Option<Vec<TodoRecord>>;

/// Producer half of a live query; every push replaces the previous snapshot.
#[derive(Debug)]
pub struct FeedPublisher {
    tx: watch::Sender<Snapshot>,
}

impl FeedPublisher {
    pub fn push(&self, records: Vec<TodoRecord>) {
        self.tx.send_replace(Some(records));
    }

    pub fn subscribe(&self) -> TodoFeed {
        TodoFeed {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live feeds still attached.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[derive(Debug, Clone)]
pub struct TodoFeed {
    rx: watch::Receiver<Snapshot>,
}

impl TodoFeed {
    /// A publisher/feed pair with no snapshot yet, for backends and tests
    /// that push snapshots by hand.
    pub fn channel() -> (FeedPublisher, TodoFeed) {
        let (tx, rx) = watch::channel(None);
        (FeedPublisher { tx }, TodoFeed { rx })
    }

    /// A feed that never resolves.
    pub fn unresolved() -> Self {
        let (_publisher, feed) = Self::channel();
        feed
    }

    /// Current snapshot without waiting; marks it as seen.
    pub fn latest(&mut self) -> Snapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Returns the snapshot only if a push arrived since the last read.
    pub fn take_if_changed(&mut self) -> Option<Snapshot> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.latest()),
            _ => None,
        }
    }

    /// Waits for the next push. Errors once the publisher is gone.
    pub async fn changed(&mut self) -> Result<Snapshot, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(self.latest())
    }

    pub fn into_stream(self) -> WatchStream<Snapshot> {
        WatchStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use shared::domain::{OwnerId, TodoRecord};

    use super::*;

    #[test]
    fn unseen_push_is_taken_once() {
        let (publisher, mut feed) = TodoFeed::channel();
        assert!(feed.take_if_changed().is_none());

        publisher.push(vec![TodoRecord::new(OwnerId::from("u"), "a")]);
        let snapshot = feed.take_if_changed().expect("push observed");
        assert_eq!(snapshot.map(|records| records.len()), Some(1));
        assert!(feed.take_if_changed().is_none());
    }

    #[tokio::test]
    async fn stream_yields_current_then_pushed_snapshots() {
        let (publisher, feed) = TodoFeed::channel();
        let mut stream = feed.into_stream();

        assert_eq!(stream.next().await, Some(None));
        publisher.push(Vec::new());
        assert_eq!(stream.next().await, Some(Some(Vec::new())));
    }

    #[tokio::test]
    async fn changed_errors_after_publisher_drops() {
        let mut feed = TodoFeed::unresolved();
        assert!(feed.changed().await.is_err());
        assert_eq!(feed.latest(), None);
    }
}
