use tokio::sync::broadcast;

use crate::event::RunEvent;

/// Fan-out channel for run progress. Publishing never blocks; slow
/// subscribers lose the oldest events.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<RunEvent>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers reached; zero when nobody listens.
    pub fn publish(&self, event: RunEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    fn test_event() -> RunEvent {
        RunEvent::Started {
            run_id: "run-1".to_string(),
            query: "text John".to_string(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(test_event()), 1);

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("recv");
        assert!(matches!(received, RunEvent::Started { ref run_id, .. } if run_id == "run-1"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = Bus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(test_event());

        assert_eq!(rx1.recv().await.expect("recv1").run_id(), "run-1");
        assert_eq!(rx2.recv().await.expect("recv2").run_id(), "run-1");
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = Bus::new(4);
        assert_eq!(bus.publish(test_event()), 0);
    }
}
