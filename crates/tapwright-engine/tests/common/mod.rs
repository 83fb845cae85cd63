#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tapwright_engine::backend::{Backend, BackendError};
use tapwright_engine::locator::ChainOptions;
use tapwright_engine::protocol::{ElementCommand, ElementHandle, LocatorSpec, Point};
use tokio::time::Instant;

// =============================================================================
// Fake UI tree
// =============================================================================

#[derive(Debug, Clone)]
pub struct MockElement {
    pub id: Option<String>,
    pub class_name: String,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub displayed: bool,
    pub enabled: bool,
    /// Not part of the tree until this long after the backend was created.
    pub appears_after: Duration,
    /// Reports disabled until this long after the backend was created.
    pub enabled_after: Duration,
    /// Number of upcoming `act` calls that fail as stale.
    pub stale_acts: u32,
    /// Text and attribute reads fail.
    pub unreadable: bool,
}

impl MockElement {
    pub fn new(class_name: &str) -> Self {
        Self {
            id: None,
            class_name: class_name.to_string(),
            text: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
            appears_after: Duration::ZERO,
            enabled_after: Duration::ZERO,
            stale_acts: 0,
            unreadable: false,
        }
    }

    pub fn button(id: &str, text: &str) -> Self {
        Self::new("android.widget.Button").id(id).text(text)
    }

    pub fn edit_text(id: &str, hint: &str) -> Self {
        Self::new("android.widget.EditText")
            .id(id)
            .attr("hint", hint)
    }

    pub fn text_view(text: &str) -> Self {
        Self::new("android.widget.TextView").text(text)
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appears_after_ms(mut self, ms: u64) -> Self {
        self.appears_after = Duration::from_millis(ms);
        self
    }

    pub fn enabled_after_ms(mut self, ms: u64) -> Self {
        self.enabled_after = Duration::from_millis(ms);
        self
    }

    pub fn stale_on_act(mut self, times: u32) -> Self {
        self.stale_acts = times;
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.text.clone())
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "resource-id" | "id" => self.id.clone(),
            "text" => Some(self.text.clone()),
            _ => self.attributes.get(name).cloned(),
        }
    }

    fn matches(&self, locator: &LocatorSpec) -> bool {
        match locator {
            LocatorSpec::Identifier(id) => self.id.as_deref() == Some(id.as_str()),
            LocatorSpec::AttributeContains { attr, substring } => self
                .attribute(attr)
                .is_some_and(|v| v.contains(substring.as_str())),
            LocatorSpec::TextEquals(text) => &self.text == text,
            LocatorSpec::TextContains(text) => self.text.contains(text.as_str()),
            LocatorSpec::Class { class_name, .. } => &self.class_name == class_name,
            LocatorSpec::Coordinate { .. } => false,
        }
    }
}

// =============================================================================
// Mock Backend
// =============================================================================

pub struct MockBackend {
    pub elements: Vec<MockElement>,
    /// Bumped whenever the tree is rebuilt; older handles go stale.
    pub generation: u64,
    pub created: Instant,
    /// Every command the backend received, in order.
    pub log: Vec<String>,
    /// Element that receives keys after a tap.
    pub focus_on_tap: Option<usize>,
    pub focused: Option<usize>,
    pub connection_lost: bool,
    pub page_source_error: Option<BackendError>,
    pub find_calls: usize,
}

impl MockBackend {
    pub fn new(elements: Vec<MockElement>) -> Self {
        Self {
            elements,
            generation: 0,
            created: Instant::now(),
            log: Vec::new(),
            focus_on_tap: None,
            focused: None,
            connection_lost: false,
            page_source_error: None,
            find_calls: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Index of the first element with this id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
    }

    pub fn text_of(&self, id: &str) -> Option<&str> {
        self.index_of(id).map(|i| self.elements[i].text.as_str())
    }

    pub fn clicks(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|l| l.strip_prefix("click:"))
            .collect()
    }

    fn check_connection(&self) -> Result<(), BackendError> {
        if self.connection_lost {
            Err(BackendError::ConnectionLost)
        } else {
            Ok(())
        }
    }

    fn present(&self, element: &MockElement) -> bool {
        self.created.elapsed() >= element.appears_after
    }

    fn handle_for(&self, index: usize) -> ElementHandle {
        ElementHandle::new(format!("{}:{}", self.generation, index))
    }

    fn lookup(&self, handle: &ElementHandle) -> Result<usize, BackendError> {
        self.check_connection()?;
        let stale = || BackendError::ElementStale(handle.to_string());
        let (generation, index) = handle.as_str().split_once(':').ok_or_else(stale)?;
        let generation: u64 = generation.parse().map_err(|_| stale())?;
        let index: usize = index.parse().map_err(|_| stale())?;
        if generation != self.generation || index >= self.elements.len() {
            return Err(stale());
        }
        Ok(index)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.log.push("launch".into());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.log.push("close".into());
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        !self.connection_lost
    }

    async fn find_elements(
        &mut self,
        locator: &LocatorSpec,
    ) -> Result<Vec<ElementHandle>, BackendError> {
        self.check_connection()?;
        self.find_calls += 1;
        if locator.is_coordinate() {
            return Err(BackendError::NotSupported("coordinate lookup".into()));
        }
        Ok(self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| self.present(e) && e.matches(locator))
            .map(|(i, _)| self.handle_for(i))
            .collect())
    }

    async fn page_source(&mut self) -> Result<String, BackendError> {
        self.check_connection()?;
        if let Some(err) = &self.page_source_error {
            return Err(err.clone());
        }
        Ok(self
            .elements
            .iter()
            .filter(|e| self.present(e))
            .map(|e| format!("<{} text=\"{}\"/>", e.class_name, e.text))
            .collect())
    }

    async fn element_text(&mut self, handle: &ElementHandle) -> Result<String, BackendError> {
        let i = self.lookup(handle)?;
        if self.elements[i].unreadable {
            return Err(BackendError::ScriptError("text unavailable".into()));
        }
        Ok(self.elements[i].text.clone())
    }

    async fn element_attribute(
        &mut self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BackendError> {
        let i = self.lookup(handle)?;
        if self.elements[i].unreadable {
            return Err(BackendError::ScriptError("attribute unavailable".into()));
        }
        Ok(self.elements[i].attribute(name))
    }

    async fn is_displayed(&mut self, handle: &ElementHandle) -> Result<bool, BackendError> {
        let i = self.lookup(handle)?;
        Ok(self.elements[i].displayed)
    }

    async fn is_enabled(&mut self, handle: &ElementHandle) -> Result<bool, BackendError> {
        let i = self.lookup(handle)?;
        let element = &self.elements[i];
        Ok(element.enabled && self.created.elapsed() >= element.enabled_after)
    }

    async fn act(
        &mut self,
        handle: &ElementHandle,
        command: ElementCommand,
    ) -> Result<(), BackendError> {
        let i = self.lookup(handle)?;
        if self.elements[i].stale_acts > 0 {
            self.elements[i].stale_acts -= 1;
            self.generation += 1;
            return Err(BackendError::ElementStale(handle.to_string()));
        }

        let label = self.elements[i].label();
        match command {
            ElementCommand::Click => self.log.push(format!("click:{}", label)),
            ElementCommand::Clear => {
                self.elements[i].text.clear();
                self.log.push(format!("clear:{}", label));
            }
            ElementCommand::SendKeys(text) => {
                self.elements[i].text.push_str(&text);
                self.log.push(format!("keys:{}", label));
            }
            ElementCommand::ScrollIntoView => self.log.push(format!("scroll:{}", label)),
        }
        Ok(())
    }

    async fn tap_at(&mut self, point: Point) -> Result<(), BackendError> {
        self.check_connection()?;
        self.log.push(format!("tap:{},{}", point.x, point.y));
        self.focused = self.focus_on_tap;
        Ok(())
    }

    async fn send_keys_to_focused(&mut self, text: &str) -> Result<(), BackendError> {
        self.check_connection()?;
        let Some(i) = self.focused else {
            return Err(BackendError::ElementNotFound("focused element".into()));
        };
        self.elements[i].text.push_str(text);
        self.log.push(format!("focused_keys:{}", self.elements[i].label()));
        Ok(())
    }

    async fn navigate_back(&mut self) -> Result<(), BackendError> {
        self.check_connection()?;
        self.generation += 1;
        self.log.push("back".into());
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BackendError> {
        self.check_connection()?;
        self.generation += 1;
        self.log.push(format!("navigate:{}", url));
        Ok(())
    }
}

/// Short budgets so failing chains finish quickly.
pub fn fast_chain() -> ChainOptions {
    ChainOptions {
        default_timeout: Duration::from_millis(600),
        min_attempt: Duration::from_millis(100),
        poll_interval: Duration::from_millis(50),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tapwright_engine=debug")
        .with_test_writer()
        .try_init();
}
