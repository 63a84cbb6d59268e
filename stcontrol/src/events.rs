use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::browser::BrowserSnapshot;

#[derive(Clone, Debug)]
pub enum BrowserEvent {
    /// A listing or playback request started; navigation is locked.
    Busy,
    /// The request finished and this is the state to display.
    Updated(BrowserSnapshot),
}

/// Fan-out of browser events. Subscribers that went away are pruned on the
/// next broadcast, so late results never reach a disposed view.
#[derive(Clone, Default)]
pub struct BrowserEventBus {
    subscribers: Arc<Mutex<Vec<Sender<BrowserEvent>>>>,
}

impl BrowserEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> Receiver<BrowserEvent> {
        let (tx, rx) = unbounded::<BrowserEvent>();
        {
            let mut subscribers = self
                .subscribers
                .lock()
                .expect("BrowserEventBus mutex poisoned");
            subscribers.push(tx);
        }
        rx
    }

    pub fn broadcast(&self, event: BrowserEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("BrowserEventBus mutex poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("BrowserEventBus mutex poisoned")
            .len()
    }
}
