use crate::error_mapping::map_cmd_error;
use crate::webdriver::{WebDriverClient, wait_for_server};
use crate::xpath::to_xpath;
use async_trait::async_trait;
use fantoccini::Locator;
use fantoccini::elements::Element;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tapwright_engine::backend::{Backend, BackendError};
use tapwright_engine::config::SessionConfig;
use tapwright_engine::protocol::{ElementCommand, ElementHandle, LocatorSpec, Platform, Point};
use tracing::{debug, info};

/// Live element references keyed by generated handle.
///
/// Only the most recent query's results are kept: each query replaces the
/// table, so a handle from an earlier query reports `ElementStale`.
struct HandleTable<T> {
    entries: HashMap<String, T>,
    next_handle: u64,
}

impl<T> HandleTable<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_handle: 0,
        }
    }

    fn replace(&mut self, items: Vec<T>) -> Vec<ElementHandle> {
        self.entries.clear();
        items
            .into_iter()
            .map(|item| {
                self.next_handle += 1;
                let id = format!("wd-{}", self.next_handle);
                self.entries.insert(id.clone(), item);
                ElementHandle::new(id)
            })
            .collect()
    }

    fn get(&self, handle: &ElementHandle) -> Result<&T, BackendError> {
        self.entries
            .get(handle.as_str())
            .ok_or_else(|| BackendError::ElementStale(handle.to_string()))
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A session on a remote WebDriver server: Appium for Android, a browser
/// driver for web.
///
/// Elements found are kept by handle until the next query or navigation. A
/// handle that is no longer known reports `ElementStale`.
pub struct RemoteBackend {
    server_url: String,
    platform: Platform,
    capabilities: Map<String, Value>,
    ready_timeout: Duration,
    client: Option<WebDriverClient>,
    elements: HandleTable<Element>,
}

impl RemoteBackend {
    pub fn new(server_url: impl Into<String>, platform: Platform) -> Self {
        Self {
            server_url: server_url.into(),
            platform,
            capabilities: Map::new(),
            ready_timeout: Duration::from_secs(10),
            client: None,
            elements: HandleTable::new(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            capabilities: config.capabilities.clone(),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
            ..Self::new(config.server_url.clone(), config.platform)
        }
    }

    pub fn with_capabilities(mut self, capabilities: Map<String, Value>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn client(&self) -> Result<&fantoccini::Client, BackendError> {
        self.client
            .as_ref()
            .map(|c| &c.client)
            .ok_or(BackendError::NotReady)
    }

    fn element(&self, handle: &ElementHandle) -> Result<&Element, BackendError> {
        self.client()?;
        self.elements.get(handle)
    }

    /// Handles never survive a page change.
    fn forget_elements(&mut self) {
        self.elements.clear();
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!(
            "Waiting for {:?} automation server at {}...",
            self.platform, self.server_url
        );
        wait_for_server(&self.server_url, self.ready_timeout).await?;

        let client = WebDriverClient::connect(&self.server_url, self.capabilities.clone()).await?;
        self.client = Some(client);
        info!("Session started");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.forget_elements();
        if let Some(client) = self.client.take() {
            client.close().await?;
            info!("Session closed");
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn find_elements(
        &mut self,
        locator: &LocatorSpec,
    ) -> Result<Vec<ElementHandle>, BackendError> {
        let xpath = to_xpath(self.platform, locator)?;
        let found = self
            .client()?
            .find_all(Locator::XPath(&xpath))
            .await
            .map_err(|e| map_cmd_error(e, &locator.to_string()))?;
        debug!("{} matched {} element(s)", xpath, found.len());

        Ok(self.elements.replace(found))
    }

    async fn page_source(&mut self) -> Result<String, BackendError> {
        self.client()?
            .source()
            .await
            .map_err(|e| map_cmd_error(e, "page source"))
    }

    async fn element_text(&mut self, handle: &ElementHandle) -> Result<String, BackendError> {
        self.element(handle)?
            .text()
            .await
            .map_err(|e| map_cmd_error(e, handle.as_str()))
    }

    async fn element_attribute(
        &mut self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BackendError> {
        self.element(handle)?
            .attr(name)
            .await
            .map_err(|e| map_cmd_error(e, handle.as_str()))
    }

    async fn is_displayed(&mut self, handle: &ElementHandle) -> Result<bool, BackendError> {
        self.element(handle)?
            .is_displayed()
            .await
            .map_err(|e| map_cmd_error(e, handle.as_str()))
    }

    async fn is_enabled(&mut self, handle: &ElementHandle) -> Result<bool, BackendError> {
        self.element(handle)?
            .is_enabled()
            .await
            .map_err(|e| map_cmd_error(e, handle.as_str()))
    }

    async fn act(
        &mut self,
        handle: &ElementHandle,
        command: ElementCommand,
    ) -> Result<(), BackendError> {
        let element = self.element(handle)?;
        let subject = handle.as_str();

        match command {
            ElementCommand::Click => element
                .click()
                .await
                .map_err(|e| map_cmd_error(e, subject)),
            ElementCommand::Clear => element
                .clear()
                .await
                .map_err(|e| map_cmd_error(e, subject)),
            ElementCommand::SendKeys(text) => element
                .send_keys(&text)
                .await
                .map_err(|e| map_cmd_error(e, subject)),
            ElementCommand::ScrollIntoView => match self.platform {
                Platform::Web => {
                    let arg = serde_json::to_value(element)?;
                    self.client()?
                        .execute(
                            "arguments[0].scrollIntoView({block: 'center'});",
                            vec![arg],
                        )
                        .await
                        .map(|_| ())
                        .map_err(|e| map_cmd_error(e, subject))
                }
                Platform::Android => {
                    // UiAutomator2 has no element-level scroll; visible is enough.
                    let displayed = element
                        .is_displayed()
                        .await
                        .map_err(|e| map_cmd_error(e, subject))?;
                    if displayed {
                        Ok(())
                    } else {
                        Err(BackendError::NotSupported(
                            "scrolling a hidden element into view on Android".into(),
                        ))
                    }
                }
            },
        }
    }

    async fn tap_at(&mut self, point: Point) -> Result<(), BackendError> {
        let client = self.client()?;
        let subject = format!("({}, {})", point.x, point.y);

        match self.platform {
            Platform::Android => client
                .execute(
                    "mobile: clickGesture",
                    vec![json!({ "x": point.x, "y": point.y })],
                )
                .await
                .map(|_| ())
                .map_err(|e| map_cmd_error(e, &subject)),
            Platform::Web => {
                let clicked = client
                    .execute(
                        r#"
                        const el = document.elementFromPoint(arguments[0], arguments[1]);
                        if (!el) { return false; }
                        el.click();
                        return true;
                        "#,
                        vec![json!(point.x), json!(point.y)],
                    )
                    .await
                    .map_err(|e| map_cmd_error(e, &subject))?;
                if clicked.as_bool().unwrap_or(false) {
                    Ok(())
                } else {
                    Err(BackendError::ElementNotFound(subject))
                }
            }
        }
    }

    async fn send_keys_to_focused(&mut self, text: &str) -> Result<(), BackendError> {
        let focused = self
            .client()?
            .active_element()
            .await
            .map_err(|e| map_cmd_error(e, "focused element"))?;
        focused
            .send_keys(text)
            .await
            .map_err(|e| map_cmd_error(e, "focused element"))
    }

    async fn navigate_back(&mut self) -> Result<(), BackendError> {
        self.forget_elements();
        self.client()?
            .back()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BackendError> {
        self.forget_elements();
        info!("Navigating to: {}", url);
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))
    }
}
