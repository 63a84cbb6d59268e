#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use crossbeam_channel::Receiver;
use stcontrol::{
    ContainerRef, ContentItem, ContentService, ControlPointError, Item, ListResult,
    PlaybackGateway, STORED_MUSIC_SOURCE,
};

pub const ROOT: &str = "<root>";

pub fn content(location: &str) -> ContentItem {
    ContentItem::new(STORED_MUSIC_SOURCE, Some(location), Some("srv/0")).with_name(location)
}

pub fn dir(name: &str, id: &str) -> Item {
    Item::dir(name, content(id))
}

pub fn track(name: &str, id: &str) -> Item {
    Item::track(name, content(id))
}

/// In-memory library keyed by container id (`ROOT` for the virtual root).
/// Unknown ids and ids marked as failing answer with an HTTP error.
#[derive(Default)]
pub struct FakeLibrary {
    listings: HashMap<String, ListResult>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Receiver<()>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, items: Vec<Item>) -> Self {
        self.listings.insert(id.to_string(), ListResult::new(items));
        self
    }

    pub fn with_result(mut self, id: &str, result: ListResult) -> Self {
        self.listings.insert(id.to_string(), result);
        self
    }

    /// Every listing call blocks until a message arrives on `gate`.
    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().push(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().retain(|f| f != id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ContentService for FakeLibrary {
    fn list_children(
        &self,
        container: Option<&ContainerRef>,
    ) -> Result<ListResult, ControlPointError> {
        if let Some(gate) = &self.gate {
            gate.recv().unwrap();
        }

        let id = container.map(|c| c.id.clone()).unwrap_or_else(|| ROOT.to_string());
        self.calls.lock().unwrap().push(id.clone());

        if self.failing.lock().unwrap().contains(&id) {
            return Err(ControlPointError::Http("navigate".to_string(), "timed out".to_string()));
        }

        self.listings
            .get(&id)
            .cloned()
            .ok_or_else(|| ControlPointError::Http("navigate".to_string(), format!("no container {}", id)))
    }
}

#[derive(Default)]
pub struct FakePlayer {
    played: Mutex<Vec<ContentItem>>,
    failing: Mutex<bool>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn played(&self) -> Vec<ContentItem> {
        self.played.lock().unwrap().clone()
    }
}

impl PlaybackGateway for FakePlayer {
    fn play(&self, play_ref: &ContentItem) -> Result<(), ControlPointError> {
        self.played.lock().unwrap().push(play_ref.clone());
        if *self.failing.lock().unwrap() {
            return Err(ControlPointError::DeviceError {
                code: 1005,
                name: "UNKNOWN_SOURCE_ERROR".to_string(),
                message: String::new(),
            });
        }
        Ok(())
    }
}

/// Root -> Folder -> /mnt/usb1_1 -> Artists -> (tracks), as laid out on a
/// SoundTouch with one USB stick.
pub fn soundtouch_library() -> FakeLibrary {
    FakeLibrary::new()
        .with(ROOT, vec![dir("Folder", "1"), dir("Genre", "5")])
        .with("1", vec![dir("/mnt/usb1_1", "2")])
        .with("2", vec![dir("Artists", "3"), track("loose.mp3", "2$9")])
        .with("3", vec![track("So What", "3$1"), track("Blue in Green", "3$2")])
        .with("5", vec![])
}
