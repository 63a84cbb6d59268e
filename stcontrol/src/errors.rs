use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlPointError {
    // Transport layer: connection refused, timeout, unreadable body
    #[error("HTTP error on {0}: {1}")]
    Http(String, String),
    #[error("Invalid XML in {0} response: {1}")]
    XmlParse(String, String),
    #[error("Missing {0} element in {1} response")]
    MissingElement(String, String),
    #[error("Device returned error {code} ({name}): {message}")]
    DeviceError {
        code: u32,
        name: String,
        message: String,
    },
    #[error("Device reports no media server")]
    NoMediaServer,
    #[error("Discovery Error: {0}")]
    Discovery(String),

    // Browser
    #[error("Failed to list {0}: {1}")]
    FetchFailed(String, String),
    #[error("Failed to play {0}: {1}")]
    PlaybackFailed(String, String),
    #[error("Bootstrap stopped at {0}: {1}")]
    BootstrapIncomplete(String, String),
    #[error("{0} is not a container")]
    NotAContainer(String),
    #[error("Browser is busy, navigation request dropped")]
    Busy,
    #[error("Browser session is closed")]
    SessionClosed,
}

impl ControlPointError {
    pub fn http(endpoint: &str, err: impl std::fmt::Display) -> Self {
        ControlPointError::Http(endpoint.to_string(), err.to_string())
    }

    pub fn xml_parse(endpoint: &str, err: impl std::fmt::Display) -> Self {
        ControlPointError::XmlParse(endpoint.to_string(), err.to_string())
    }

    pub fn missing_element(element: &str, endpoint: &str) -> Self {
        ControlPointError::MissingElement(element.to_string(), endpoint.to_string())
    }

    pub fn fetch_failed(container: &str, cause: &ControlPointError) -> Self {
        ControlPointError::FetchFailed(container.to_string(), cause.to_string())
    }

    pub fn playback_failed(item: &str, cause: &ControlPointError) -> Self {
        ControlPointError::PlaybackFailed(item.to_string(), cause.to_string())
    }

    pub fn bootstrap_incomplete(level: &str, reason: &str) -> Self {
        ControlPointError::BootstrapIncomplete(level.to_string(), reason.to_string())
    }

    /// True for failures caused by the network or the device rather than by
    /// a misuse of the browser.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ControlPointError::Http(..)
                | ControlPointError::XmlParse(..)
                | ControlPointError::MissingElement(..)
                | ControlPointError::DeviceError { .. }
                | ControlPointError::NoMediaServer
        )
    }
}
