use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Source name of the device's local music library (USB stick, NAS share).
pub const STORED_MUSIC_SOURCE: &str = "STORED_MUSIC";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

/// Identity returned by `GET /info`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub name: String,
    pub device_type: Option<String>,
}

/// Media server (DLNA/NAS/USB indexer) the device browses for `STORED_MUSIC`.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaServer {
    pub id: String,
    pub friendly_name: String,
    pub ip: Option<String>,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub location: Option<String>,
}

/// Device-side handle for a piece of content.
///
/// The same structure is sent back to the device to list a container
/// (`/navigate`) or to start playback (`/select`), so it is the play
/// reference of every browsed entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub source: String,
    pub location: Option<String>,
    pub source_account: Option<String>,
    pub is_presetable: bool,
    pub item_name: Option<String>,
}

impl ContentItem {
    pub fn new(source: &str, location: Option<&str>, source_account: Option<&str>) -> Self {
        Self {
            source: source.to_string(),
            location: location.map(str::to_string),
            source_account: source_account.map(str::to_string),
            is_presetable: false,
            item_name: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.item_name = Some(name.to_string());
        self
    }

    /// Human label used in logs and status messages.
    pub fn label(&self) -> &str {
        self.item_name
            .as_deref()
            .or(self.location.as_deref())
            .unwrap_or(self.source.as_str())
    }
}

/// A navigable node of the remote library.
///
/// Two refs are the same container iff their ids match; the display name and
/// the content handle are carried along for breadcrumbs and listing calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContainerRef {
    pub id: String,
    pub name: String,
    pub content: ContentItem,
}

impl ContainerRef {
    pub fn new(id: &str, name: &str, content: ContentItem) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            content,
        }
    }
}

impl PartialEq for ContainerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContainerRef {}

impl Hash for ContainerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Dir,
    Track,
    Other(String),
}

impl ItemKind {
    /// Maps the `<type>` text of a navigate entry.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dir" => ItemKind::Dir,
            "track" => ItemKind::Track,
            _ => ItemKind::Other(raw.trim().to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            ItemKind::Dir => "dir",
            ItemKind::Track => "track",
            ItemKind::Other(raw) => raw.as_str(),
        }
    }
}

/// One entry of a listing. `container` is set exactly when `kind` is `Dir`.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    name: String,
    kind: ItemKind,
    play_ref: ContentItem,
    container: Option<ContainerRef>,
}

impl Item {
    pub fn new(name: &str, kind: ItemKind, play_ref: ContentItem) -> Self {
        let container = match kind {
            ItemKind::Dir => {
                let id = play_ref.location.as_deref().unwrap_or(name);
                Some(ContainerRef::new(id, name, play_ref.clone()))
            }
            _ => None,
        };
        Self {
            name: name.to_string(),
            kind,
            play_ref,
            container,
        }
    }

    pub fn dir(name: &str, play_ref: ContentItem) -> Self {
        Self::new(name, ItemKind::Dir, play_ref)
    }

    pub fn track(name: &str, play_ref: ContentItem) -> Self {
        Self::new(name, ItemKind::Track, play_ref)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn play_ref(&self) -> &ContentItem {
        &self.play_ref
    }

    pub fn container(&self) -> Option<&ContainerRef> {
        self.container.as_ref()
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ItemKind::Dir
    }
}

/// One page of a container listing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListResult {
    pub items: Vec<Item>,
    /// `totalItems` as reported by the device, when present.
    pub total: Option<u32>,
}

impl ListResult {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items, total: None }
    }

    /// The device caps a page without a continuation token; this only tells
    /// whether it admitted to holding more than it sent.
    pub fn truncated(&self) -> bool {
        match self.total {
            Some(total) => total as usize > self.items.len(),
            None => false,
        }
    }

    pub fn find_dir(&self, name: &str) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| item.is_dir() && item.name() == name)
    }
}
