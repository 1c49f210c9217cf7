use crate::event::Event;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Drives the poll timer and the one-second countdown timer.
///
/// Fires `PollDue` immediately and then every `interval`. Dropping the poller
/// aborts both timers; every event carries the generation it was started
/// with so the receiver can ignore anything from an older poller.
#[derive(Debug)]
pub struct Poller {
    generation: u64,
    task: JoinHandle<()>,
}

impl Poller {
    pub fn start(interval: Duration, generation: u64, tx: mpsc::UnboundedSender<Event>) -> Self {
        debug!(generation, ?interval, "starting poller");
        let task = tokio::spawn(async move {
            let mut poll = tokio::time::interval(interval);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut countdown = tokio::time::interval_at(Instant::now() + COUNTDOWN_STEP, COUNTDOWN_STEP);
            countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let event = tokio::select! {
                    biased;
                    _ = poll.tick() => Event::PollDue { generation },
                    _ = countdown.tick() => Event::CountdownTick { generation },
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { generation, task }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        debug!(generation = self.generation, "stopping poller");
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_counts_down() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = Poller::start(Duration::from_secs(3), 7, tx);
        assert_eq!(poller.generation(), 7);

        assert!(matches!(rx.recv().await, Some(Event::PollDue { generation: 7 })));
        assert!(matches!(rx.recv().await, Some(Event::CountdownTick { generation: 7 })));
        assert!(matches!(rx.recv().await, Some(Event::CountdownTick { generation: 7 })));
        // Both timers are due at t=3s; the poll wins.
        assert!(matches!(rx.recv().await, Some(Event::PollDue { generation: 7 })));
        assert!(matches!(rx.recv().await, Some(Event::CountdownTick { generation: 7 })));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_stops_both_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = Poller::start(Duration::from_secs(30), 1, tx);

        assert!(matches!(rx.recv().await, Some(Event::PollDue { .. })));
        drop(poller);
        while let Ok(Some(_)) = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await {}
        assert!(rx.recv().await.is_none());
    }
}
