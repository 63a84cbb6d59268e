//! Remote content-tree browser: navigation stack, engine and session.

pub mod engine;
pub mod session;
pub mod stack;

pub use engine::{
    BootstrapPath, BrowserEngine, BrowserSnapshot, DEFAULT_BOOTSTRAP_FOLDER,
    DEFAULT_BOOTSTRAP_MOUNT, Listing,
};
pub use session::{BrowserCommand, BrowserSession};
pub use stack::{BREADCRUMB_SEPARATOR, NavigationStack, ROOT_LABEL};
