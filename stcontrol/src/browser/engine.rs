use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::browser::stack::{NavigationStack, ROOT_LABEL};
use crate::content_service::{ContentService, PlaybackGateway};
use crate::errors::ControlPointError;
use crate::model::{ContainerRef, Item, ListResult};

pub const DEFAULT_BOOTSTRAP_FOLDER: &str = "Folder";
pub const DEFAULT_BOOTSTRAP_MOUNT: &str = "/mnt/usb1_1";

/// What the browser currently shows for the top of the stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Listing {
    Loaded(Vec<Item>),
    /// The container was listed and has no children.
    Empty,
    /// The listing call failed; the message is meant for display.
    Failed(String),
}

impl Listing {
    pub fn items(&self) -> &[Item] {
        match self {
            Listing::Loaded(items) => items,
            Listing::Empty | Listing::Failed(_) => &[],
        }
    }
}

/// Containers probed, in order, when a session starts without a saved path.
///
/// On SoundTouch devices the stored-music root holds a `Folder` view whose
/// children are the mount points; the first USB stick is `/mnt/usb1_1`.
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapPath {
    pub folder: String,
    pub mount: String,
}

impl Default for BootstrapPath {
    fn default() -> Self {
        Self {
            folder: DEFAULT_BOOTSTRAP_FOLDER.to_string(),
            mount: DEFAULT_BOOTSTRAP_MOUNT.to_string(),
        }
    }
}

/// Everything a presentation layer needs to draw the browser.
#[derive(Clone, Debug, PartialEq)]
pub struct BrowserSnapshot {
    pub listing: Listing,
    pub breadcrumb: String,
    pub depth: usize,
    /// Only meaningful on snapshots taken from a [`BrowserSession`](crate::BrowserSession);
    /// the engine itself returns from every request idle.
    pub busy: bool,
    pub status: Option<String>,
}

impl BrowserSnapshot {
    pub fn items(&self) -> &[Item] {
        self.listing.items()
    }

    pub fn can_go_back(&self) -> bool {
        self.depth > 0
    }
}

pub struct BrowserEngine {
    content: Arc<dyn ContentService>,
    playback: Arc<dyn PlaybackGateway>,
    bootstrap: BootstrapPath,
    stack: NavigationStack,
    listing: Listing,
    busy: bool,
    status: Option<String>,
}

impl BrowserEngine {
    pub fn new(content: Arc<dyn ContentService>, playback: Arc<dyn PlaybackGateway>) -> Self {
        Self {
            content,
            playback,
            bootstrap: BootstrapPath::default(),
            stack: NavigationStack::new(),
            listing: Listing::Empty,
            busy: false,
            status: None,
        }
    }

    pub fn with_bootstrap(mut self, bootstrap: BootstrapPath) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Restores `saved` (re-listing its top) or, when it is empty, walks the
    /// bootstrap path as far as the device allows.
    pub fn initialize(&mut self, saved: NavigationStack) {
        self.begin();
        self.stack = saved;

        match self.stack.pop() {
            Some(top) => {
                info!(
                    depth = self.stack.len() + 1,
                    container = top.name.as_str(),
                    "Restoring last browse path"
                );
                self.descend(top);
            }
            None => self.run_bootstrap(),
        }

        self.finish();
    }

    /// Descends into a directory entry.
    pub fn enter(&mut self, item: &Item) -> Result<(), ControlPointError> {
        let Some(container) = item.container().cloned() else {
            let err = ControlPointError::NotAContainer(item.name().to_string());
            warn!(item = item.name(), "Refusing to enter a non-container entry");
            self.status = Some(err.to_string());
            return Err(err);
        };

        self.begin();
        self.descend(container);
        self.finish();
        Ok(())
    }

    /// Leaves the current container. On the virtual root the stack is left
    /// alone and the root is listed again.
    pub fn back(&mut self) {
        self.begin();
        if let Some(left) = self.stack.pop() {
            debug!(container = left.name.as_str(), "Leaving container");
        }
        self.load_current();
        self.finish();
    }

    /// Lists the current container again without touching the stack.
    pub fn refresh(&mut self) {
        self.begin();
        self.load_current();
        self.finish();
    }

    /// Row activation: directories are entered, anything else is played.
    pub fn select(&mut self, item: &Item) {
        match item.container() {
            Some(container) => {
                let container = container.clone();
                self.begin();
                self.descend(container);
                self.finish();
            }
            None => self.play(item),
        }
    }

    /// Plays the entry whatever its kind; navigation state is unchanged.
    pub fn force_play(&mut self, item: &Item) {
        self.play(item);
    }

    pub fn current_items(&self) -> &[Item] {
        self.listing.items()
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn breadcrumb(&self) -> String {
        self.stack.breadcrumb()
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    /// Always false between calls, since every request runs to completion
    /// under `&mut self`. Observe `BrowserSession::is_busy` for a request
    /// that is still running.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn snapshot(&self) -> BrowserSnapshot {
        BrowserSnapshot {
            listing: self.listing.clone(),
            breadcrumb: self.stack.breadcrumb(),
            depth: self.stack.len(),
            busy: self.busy,
            status: self.status.clone(),
        }
    }

    /// Ends the session and hands the path back for persistence.
    pub fn close(self) -> NavigationStack {
        self.stack
    }

    fn begin(&mut self) {
        self.busy = true;
    }

    fn finish(&mut self) {
        self.busy = false;
    }

    fn run_bootstrap(&mut self) {
        let root = match self.fetch(None) {
            Ok(root) => root,
            Err(err) => {
                self.fail(ROOT_LABEL, err);
                return;
            }
        };

        let Some(folder) = root
            .find_dir(&self.bootstrap.folder)
            .and_then(|item| item.container().cloned())
        else {
            self.show(root);
            let reason = format!("no {} container", self.bootstrap.folder);
            self.report_bootstrap(ROOT_LABEL, &reason);
            return;
        };

        self.stack.push(folder.clone());
        let folder_listing = match self.fetch(Some(&folder)) {
            Ok(listing) => listing,
            Err(err) => {
                self.stack.pop();
                self.show(root);
                self.report_bootstrap(ROOT_LABEL, &err.to_string());
                return;
            }
        };

        let Some(mount) = folder_listing
            .find_dir(&self.bootstrap.mount)
            .and_then(|item| item.container().cloned())
        else {
            self.show(folder_listing);
            let reason = format!("no {} container", self.bootstrap.mount);
            self.report_bootstrap(&folder.name, &reason);
            return;
        };

        self.stack.push(mount.clone());
        match self.fetch(Some(&mount)) {
            Ok(listing) => {
                info!(container = mount.name.as_str(), "Bootstrap reached mount point");
                self.show(listing);
            }
            Err(err) => {
                self.stack.pop();
                self.show(folder_listing);
                self.report_bootstrap(&folder.name, &err.to_string());
            }
        }
    }

    /// Push then list; a failed listing pops the container again so the
    /// breadcrumb never names a level whose children are not shown.
    fn descend(&mut self, container: ContainerRef) {
        info!(container = container.name.as_str(), "Entering container");
        self.stack.push(container.clone());
        match self.fetch(Some(&container)) {
            Ok(result) => self.show(result),
            Err(err) => {
                self.stack.pop();
                self.fail(&container.name, err);
            }
        }
    }

    fn load_current(&mut self) {
        let top = self.stack.peek().cloned();
        match self.fetch(top.as_ref()) {
            Ok(result) => self.show(result),
            Err(err) => {
                let label = top.as_ref().map(|c| c.name.as_str()).unwrap_or(ROOT_LABEL);
                self.fail(label, err);
            }
        }
    }

    fn fetch(&self, container: Option<&ContainerRef>) -> Result<ListResult, ControlPointError> {
        debug!(
            container = container.map(|c| c.name.as_str()).unwrap_or(ROOT_LABEL),
            "Listing container"
        );
        self.content.list_children(container)
    }

    fn show(&mut self, result: ListResult) {
        self.status = if result.truncated() {
            Some(format!(
                "Showing {} of {} entries",
                result.items.len(),
                result.total.unwrap_or_default()
            ))
        } else {
            None
        };

        self.listing = if result.items.is_empty() {
            Listing::Empty
        } else {
            Listing::Loaded(result.items)
        };
    }

    fn fail(&mut self, label: &str, cause: ControlPointError) {
        let err = ControlPointError::fetch_failed(label, &cause);
        warn!(
            container = label,
            remote = cause.is_remote(),
            error = %cause,
            "Listing failed"
        );
        self.listing = Listing::Failed(err.to_string());
        self.status = Some(err.to_string());
    }

    fn report_bootstrap(&mut self, level: &str, reason: &str) {
        let err = ControlPointError::bootstrap_incomplete(level, reason);
        warn!(level = level, reason = reason, "Bootstrap fell back");
        self.status = Some(err.to_string());
    }

    fn play(&mut self, item: &Item) {
        info!(item = item.name(), "Playing entry");
        match self.playback.play(item.play_ref()) {
            Ok(()) => {
                self.status = Some(format!("Playing {}", item.name()));
            }
            Err(cause) => {
                let err = ControlPointError::playback_failed(item.name(), &cause);
                warn!(item = item.name(), error = %cause, "Playback request failed");
                self.status = Some(err.to_string());
            }
        }
    }
}
