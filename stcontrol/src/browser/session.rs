//! Threaded front of a [`BrowserEngine`].
//!
//! A presentation layer never calls the engine directly: it dispatches
//! commands to a session, which runs them one at a time on a worker thread
//! and publishes the resulting state on a [`BrowserEventBus`].
//!
//! ## Single flight
//!
//! The session holds one busy token. `dispatch` claims it; the worker
//! releases it once the request is done and before the new state is
//! broadcast. A command dispatched while the token is held is dropped and
//! `ControlPointError::Busy` is returned, so the stack can never be mutated
//! by two navigations at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, warn};

use crate::browser::engine::{BrowserEngine, BrowserSnapshot};
use crate::browser::stack::NavigationStack;
use crate::errors::ControlPointError;
use crate::events::{BrowserEvent, BrowserEventBus};
use crate::model::Item;

#[derive(Clone, Debug)]
pub enum BrowserCommand {
    Select(Item),
    ForcePlay(Item),
    Back,
    Refresh,
}

enum SessionMessage {
    Command(BrowserCommand),
    Close,
}

pub struct BrowserSession {
    commands: Sender<SessionMessage>,
    events: BrowserEventBus,
    busy: Arc<AtomicBool>,
    latest: Arc<Mutex<BrowserSnapshot>>,
    worker: Option<JoinHandle<NavigationStack>>,
}

impl BrowserSession {
    /// Starts the worker, which first restores `saved` (or bootstraps).
    /// The session reports busy until that first listing is done.
    pub fn spawn(engine: BrowserEngine, saved: NavigationStack) -> std::io::Result<Self> {
        Self::spawn_with_events(engine, saved, BrowserEventBus::new())
    }

    /// Like [`spawn`](Self::spawn) on a bus the caller already subscribed
    /// to, so the initial listing is never missed.
    pub fn spawn_with_events(
        engine: BrowserEngine,
        saved: NavigationStack,
        events: BrowserEventBus,
    ) -> std::io::Result<Self> {
        let (tx, rx) = unbounded::<SessionMessage>();
        let busy = Arc::new(AtomicBool::new(true));
        let latest = Arc::new(Mutex::new(engine.snapshot()));

        let worker = {
            let events = events.clone();
            let busy = Arc::clone(&busy);
            let latest = Arc::clone(&latest);
            thread::Builder::new()
                .name("browser-session".to_string())
                .spawn(move || run_worker(engine, saved, rx, events, busy, latest))?
        };

        Ok(Self {
            commands: tx,
            events,
            busy,
            latest,
            worker: Some(worker),
        })
    }

    pub fn subscribe(&self) -> Receiver<BrowserEvent> {
        self.events.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Last published state, for views attaching after the fact.
    pub fn snapshot(&self) -> BrowserSnapshot {
        let mut snapshot = self
            .latest
            .lock()
            .expect("BrowserSession snapshot mutex poisoned")
            .clone();
        snapshot.busy = self.is_busy();
        snapshot
    }

    pub fn dispatch(&self, command: BrowserCommand) -> Result<(), ControlPointError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(?command, "Dropping browser command while busy");
            return Err(ControlPointError::Busy);
        }

        if self.commands.send(SessionMessage::Command(command)).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return Err(ControlPointError::SessionClosed);
        }
        Ok(())
    }

    pub fn select(&self, item: Item) -> Result<(), ControlPointError> {
        self.dispatch(BrowserCommand::Select(item))
    }

    pub fn force_play(&self, item: Item) -> Result<(), ControlPointError> {
        self.dispatch(BrowserCommand::ForcePlay(item))
    }

    pub fn back(&self) -> Result<(), ControlPointError> {
        self.dispatch(BrowserCommand::Back)
    }

    pub fn refresh(&self) -> Result<(), ControlPointError> {
        self.dispatch(BrowserCommand::Refresh)
    }

    /// Waits for any in-flight request, stops the worker and returns the
    /// final path for the caller to persist. `None` means the worker died
    /// and the path is lost; the previously saved one should be kept.
    pub fn close(mut self) -> Option<NavigationStack> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<NavigationStack> {
        if self.commands.send(SessionMessage::Close).is_err() {
            debug!("Browser worker already stopped");
        }

        let handle = self.worker.take()?;
        match handle.join() {
            Ok(path) => Some(path),
            Err(_) => {
                warn!("Browser worker panicked, navigation path lost");
                None
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Detach: an in-flight fetch finishes on its own and its result
        // only reaches subscribers that are still alive.
        if self.worker.take().is_some() && self.commands.send(SessionMessage::Close).is_err() {
            debug!("Browser worker already stopped");
        }
    }
}

fn run_worker(
    mut engine: BrowserEngine,
    saved: NavigationStack,
    commands: Receiver<SessionMessage>,
    events: BrowserEventBus,
    busy: Arc<AtomicBool>,
    latest: Arc<Mutex<BrowserSnapshot>>,
) -> NavigationStack {
    events.broadcast(BrowserEvent::Busy);
    engine.initialize(saved);
    publish(&engine, &events, &busy, &latest);

    for message in commands.iter() {
        let command = match message {
            SessionMessage::Command(command) => command,
            SessionMessage::Close => break,
        };

        events.broadcast(BrowserEvent::Busy);
        match command {
            BrowserCommand::Select(item) => engine.select(&item),
            BrowserCommand::ForcePlay(item) => engine.force_play(&item),
            BrowserCommand::Back => engine.back(),
            BrowserCommand::Refresh => engine.refresh(),
        }
        publish(&engine, &events, &busy, &latest);
    }

    debug!(depth = engine.stack().len(), "Browser worker exiting");
    engine.close()
}

fn publish(
    engine: &BrowserEngine,
    events: &BrowserEventBus,
    busy: &AtomicBool,
    latest: &Mutex<BrowserSnapshot>,
) {
    let snapshot = engine.snapshot();
    *latest
        .lock()
        .expect("BrowserSession snapshot mutex poisoned") = snapshot.clone();
    busy.store(false, Ordering::SeqCst);
    events.broadcast(BrowserEvent::Updated(snapshot));
}
