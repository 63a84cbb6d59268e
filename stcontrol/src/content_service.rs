use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::ControlPointError;
use crate::model::{ContainerRef, ContentItem, ListResult, STORED_MUSIC_SOURCE};
use crate::soundtouch_client::{DEFAULT_PAGE_SIZE, SoundTouchClient};

/// Backend-agnostic library listing contract.
///
/// `None` lists the virtual root. Implementations may be slow, may fail and
/// may return a capped page without saying so.
pub trait ContentService: Send + Sync {
    fn list_children(
        &self,
        container: Option<&ContainerRef>,
    ) -> Result<ListResult, ControlPointError>;
}

/// Starts playback of a content handle on the device.
pub trait PlaybackGateway: Send + Sync {
    fn play(&self, play_ref: &ContentItem) -> Result<(), ControlPointError>;
}

impl PlaybackGateway for SoundTouchClient {
    fn play(&self, play_ref: &ContentItem) -> Result<(), ControlPointError> {
        debug!(
            host = self.host(),
            item = play_ref.label(),
            "Selecting content item"
        );
        self.select(play_ref)
    }
}

/// The device's local music library seen through `/navigate`.
pub struct StoredMusicLibrary {
    client: Arc<SoundTouchClient>,
    source: String,
    account: String,
    page_size: u32,
}

impl StoredMusicLibrary {
    pub fn new(client: Arc<SoundTouchClient>, account: &str) -> Self {
        Self {
            client,
            source: STORED_MUSIC_SOURCE.to_string(),
            account: account.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    /// Resolves the music account from the device's first media server.
    pub fn discover_account(client: Arc<SoundTouchClient>) -> Result<Self, ControlPointError> {
        let account = client.stored_music_account()?;
        Ok(Self::new(client, &account))
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

impl ContentService for StoredMusicLibrary {
    fn list_children(
        &self,
        container: Option<&ContainerRef>,
    ) -> Result<ListResult, ControlPointError> {
        let result = self.client.navigate(
            &self.source,
            &self.account,
            container,
            1,
            self.page_size,
        )?;

        if result.truncated() {
            // No continuation token on this API: the rest is unreachable.
            warn!(
                container = container.map(|c| c.name.as_str()).unwrap_or("<root>"),
                returned = result.items.len(),
                total = result.total.unwrap_or_default(),
                "Listing truncated by the device"
            );
        }

        Ok(result)
    }
}
