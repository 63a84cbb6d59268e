mod events;

pub mod browser;
pub mod content_service;
pub mod discovery;
pub mod errors;
pub mod model;
pub mod soundtouch_client;

pub use browser::{
    BootstrapPath, BrowserCommand, BrowserEngine, BrowserSession, BrowserSnapshot, Listing,
    NavigationStack,
};
pub use content_service::{ContentService, PlaybackGateway, StoredMusicLibrary};
pub use discovery::{DiscoveredDevice, discover};
pub use errors::ControlPointError;
pub use events::{BrowserEvent, BrowserEventBus};
pub use model::{
    ContainerRef, ContentItem, DeviceId, DeviceInfo, Item, ItemKind, ListResult, MediaServer,
    STORED_MUSIC_SOURCE,
};
pub use soundtouch_client::SoundTouchClient;
