//! Event bus for streamrev.
//!
//! Terminal input, timer ticks, git results and analysis snapshots are all
//! normalised into a single `AppEvent` and sent over a tokio unbounded MPSC
//! channel. The main loop receives from this channel and dispatches.
//!
//! Two independent intervals drive the render and logic cycles:
//! - **Render interval** (33 ms, about 30 FPS) triggers a `terminal.draw()`.
//! - **Tick interval** (250 ms) drives the request spinner.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use streamrev_core::Snapshot;
use tokio::sync::mpsc;
use tokio::time::interval;
use uuid::Uuid;

use crate::git::types::DiffPayload;

/// All events the application can receive from any source.
#[derive(Debug)]
pub enum AppEvent {
    /// A key press from the terminal (`KeyEventKind::Press` only).
    ///
    /// Release and repeat events are filtered in [`spawn_event_task`] because
    /// Windows reports both press and release for every keystroke.
    Key(KeyEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    Tick,
    Render,
    /// New diff text from the git worker or a one-shot source.
    DiffLoaded(Box<DiffPayload>),
    DiffFailed(String),
    /// A snapshot for the analysis request tagged `request`.
    Snapshot {
        request: Uuid,
        snapshot: Box<Snapshot>,
    },
    /// The request tagged `request` ended without a final snapshot.
    AnalysisFailed { request: Uuid, error: String },
}

/// Holds the sender and receiver ends of the unified event channel.
///
/// The sender (`tx`) is cloned and handed to background tasks; the receiver
/// (`rx`) is owned by the main event loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that turns crossterm input and the two timers into
/// `AppEvent`s. It exits once the receiving side is gone.
///
/// `reader.next().fuse()` keeps `tokio::select!` from polling a completed
/// future if the crossterm stream ever terminates.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let sent = tokio::select! {
                _ = tick_tick => tx.send(AppEvent::Tick),
                _ = render_tick => tx.send(AppEvent::Render),
                maybe_event = crossterm_event => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        tx.send(AppEvent::Key(key))
                    }
                    Some(Ok(Event::Resize(w, h))) => tx.send(AppEvent::Resize(w, h)),
                    _ => Ok(()),
                },
            };
            if sent.is_err() {
                break;
            }
        }
    });
}
