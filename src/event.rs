use crate::api::ApiError;
use crate::devices::{DeviceId, NormalizedDevice};
use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use secrecy::SecretString;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum Event {
    Tick,
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Poll timer fired; start a fetch-all cycle.
    PollDue { generation: u64 },
    /// One second passed on the refresh countdown.
    CountdownTick { generation: u64 },
    DevicesFetched {
        generation: u64,
        result: Result<Vec<NormalizedDevice>, ApiError>,
    },
    CredentialValidated {
        key: SecretString,
        result: Result<(), ApiError>,
    },
    DeviceDeleted {
        id: DeviceId,
        name: String,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug)]
pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: std::time::Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task_tx = tx.clone();
        let _task = tokio::spawn(async move {
            let mut reader = EventStream::new();
            let mut interval = tokio::time::interval(tick_rate);
            loop {
                let tick_delay = interval.tick();
                let crossterm_event = reader.next().fuse();
                let event = tokio::select! {
                    _ = tick_delay => Event::Tick,
                    Some(Ok(evt)) = crossterm_event => match evt {
                        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
                        CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
                        CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
                        _ => continue,
                    },
                };
                if task_tx.send(event).is_err() {
                    break;
                }
            }
        });
        Self { tx, rx, _task }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Unable to get event"))
    }
}
