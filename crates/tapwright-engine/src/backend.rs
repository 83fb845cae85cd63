use async_trait::async_trait;
pub use tapwright_common::error::BackendError;
use tapwright_common::protocol::{ElementCommand, ElementHandle, LocatorSpec, Point};

/// The remote UI-tree accessor every engine operation is written against.
///
/// One implementation drives one session. Engine functions take it as
/// `&mut B`, so a session is never queried from two places at once.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start the session (wait for the server, create the remote session).
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// End the session and release remote resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// All elements currently matching `locator`, in tree order.
    ///
    /// An empty list means "nothing matches yet". `Class` locators return every
    /// element of the class; picking the index is the caller's job.
    /// `Coordinate` locators are not element queries and return `NotSupported`.
    /// Handles returned by an earlier call may report `ElementStale` afterwards.
    async fn find_elements(
        &mut self,
        locator: &LocatorSpec,
    ) -> Result<Vec<ElementHandle>, BackendError>;

    /// Raw dump of the current UI tree (XML hierarchy or HTML).
    async fn page_source(&mut self) -> Result<String, BackendError>;

    async fn element_text(&mut self, handle: &ElementHandle) -> Result<String, BackendError>;

    async fn element_attribute(
        &mut self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BackendError>;

    async fn is_displayed(&mut self, handle: &ElementHandle) -> Result<bool, BackendError>;

    async fn is_enabled(&mut self, handle: &ElementHandle) -> Result<bool, BackendError>;

    /// Perform an element-level command.
    async fn act(
        &mut self,
        handle: &ElementHandle,
        command: ElementCommand,
    ) -> Result<(), BackendError>;

    /// Tap (or click) at a screen position.
    async fn tap_at(&mut self, point: Point) -> Result<(), BackendError>;

    /// Type into whatever currently has focus.
    async fn send_keys_to_focused(&mut self, _text: &str) -> Result<(), BackendError> {
        Err(BackendError::NotSupported("send_keys_to_focused".into()))
    }

    /// Hardware back on mobile, history back on web.
    async fn navigate_back(&mut self) -> Result<(), BackendError> {
        Err(BackendError::NotSupported("navigate_back".into()))
    }

    /// Load a URL. Only meaningful for web sessions.
    async fn navigate(&mut self, _url: &str) -> Result<(), BackendError> {
        Err(BackendError::NotSupported("navigate".into()))
    }
}
