use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

/// Suffix frames appended to the status line while a request is active.
pub const BUSY_FRAMES: &[&str] = &[".....", "///"];

/// How often the busy ticker rotates to the next frame.
pub const BUSY_INTERVAL: Duration = Duration::from_millis(500);

/// Events emitted by core workers during a launch or split request.
///
/// These events decouple the orchestration engine from the presentation
/// layer, allowing different frontends (CLI renderer, TUI dashboard) to
/// consume the same stream. Events are delivered in emission order.
#[derive(Debug, Clone)]
pub enum Event {
    /// Replace the status line with new text.
    Status(String),
    /// A non-fatal problem; the request continues.
    Warning(String),
    /// A terminal failure for the current request.
    Error(String),
    /// Step progress for the active request.
    Progress {
        completed: usize,
        total: usize,
        message: String,
    },
    /// Gate the frontend control that starts another launch request.
    ActionEnabled(bool),
    /// A long-running request began.
    TaskStarted { name: String },
    /// A long-running request finished.
    TaskFinished { name: String, success: bool },
}

/// State shared between the bus and its busy ticker task.
struct BusyState {
    /// Last substantive status text, without any ticker suffix.
    last_text: String,
    ticker: Option<JoinHandle<()>>,
}

/// Serializes status updates from any worker into a single consumer stream.
///
/// `emit` never fails and never blocks: if the consumer has hung up the
/// event is dropped (status reporting is best-effort, not a correctness
/// channel). Cloning the bus is cheap; all clones share the busy state.
#[derive(Clone)]
pub struct StatusBus {
    tx: UnboundedSender<Event>,
    busy: Arc<Mutex<BusyState>>,
}

impl StatusBus {
    /// Create a bus and the receiver the presentation loop drains.
    pub fn channel() -> (Self, UnboundedReceiver<Event>) {
        let (tx, rx) = unbounded_channel();
        let bus = Self {
            tx,
            busy: Arc::new(Mutex::new(BusyState {
                last_text: String::new(),
                ticker: None,
            })),
        };
        (bus, rx)
    }

    /// Deliver an event to the consumer, ignoring send errors
    /// (the receiver may have been dropped).
    pub fn emit(&self, event: Event) {
        if let Event::Status(ref text) = event {
            // safety: the lock is only held by short non-async sections
            let mut busy = self.busy.lock().expect("busy state poisoned");
            busy.last_text = text.clone();
        }
        let _ = self.tx.send(event);
    }

    /// Shorthand for `emit(Event::Status(...))`.
    pub fn status(&self, text: impl Into<String>) {
        self.emit(Event::Status(text.into()));
    }

    /// Shorthand for `emit(Event::Warning(...))`.
    pub fn warning(&self, text: impl Into<String>) {
        self.emit(Event::Warning(text.into()));
    }

    /// Shorthand for `emit(Event::Error(...))`.
    pub fn error(&self, text: impl Into<String>) {
        self.emit(Event::Error(text.into()));
    }

    /// Start the busy indicator.
    ///
    /// Every [`BUSY_INTERVAL`] the most recent substantive status text is
    /// re-sent with a rotating suffix appended. Ticker frames bypass `emit`
    /// so they never become the "last" text themselves. Calling this while
    /// a ticker is already running is a no-op.
    pub fn start_busy(&self) {
        let mut busy = self.busy.lock().expect("busy state poisoned");
        if busy.ticker.is_some() {
            return;
        }
        let tx = self.tx.clone();
        let state = Arc::clone(&self.busy);
        busy.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(BUSY_INTERVAL);
            // The immediate first tick would re-send the text without a frame.
            interval.tick().await;
            let mut index = 0usize;
            loop {
                interval.tick().await;
                let text = {
                    let state = state.lock().expect("busy state poisoned");
                    format!("{}{}", state.last_text, BUSY_FRAMES[index])
                };
                index = (index + 1) % BUSY_FRAMES.len();
                let _ = tx.send(Event::Status(text));
            }
        }));
    }

    /// Stop the busy indicator and restore the last substantive text.
    pub fn stop_busy(&self) {
        let (ticker, last) = {
            let mut busy = self.busy.lock().expect("busy state poisoned");
            (busy.ticker.take(), busy.last_text.clone())
        };
        if let Some(ticker) = ticker {
            ticker.abort();
            let _ = self.tx.send(Event::Status(last));
        }
    }
}

/// Receive the next core event from an optional channel.
///
/// When a request is running (`rx` is `Some`), this awaits the next event.
/// Returns `Some(event)` for each event and `None` when the channel closes
/// (sender dropped, meaning the worker task finished).
///
/// When no request is running (`rx` is `None`), this future pends forever
/// so `tokio::select!` skips this branch.
pub async fn recv_event(rx: &mut Option<UnboundedReceiver<Event>>) -> Option<Event> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
