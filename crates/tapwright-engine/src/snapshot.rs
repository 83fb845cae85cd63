//! Bounded diagnostic dumps of the current UI tree.

use crate::backend::{Backend, BackendError};
use crate::protocol::{ElementHandle, LocatorSpec, NodeGroup, Platform, Snapshot, SnapshotNode};
use tracing::{debug, warn};

pub const DEFAULT_MAX_NODES: usize = 10;

/// Which element classes belong to each snapshot category, and which
/// attributes carry identifiers and hints on a platform.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotProfile {
    pub text_classes: Vec<String>,
    pub input_classes: Vec<String>,
    pub interactive_classes: Vec<String>,
    pub identifier_attr: String,
    pub hint_attr: String,
    /// Attribute holding an input's current value. `None` reads the element text.
    pub value_attr: Option<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl SnapshotProfile {
    pub fn android() -> Self {
        Self {
            text_classes: owned(&["android.widget.TextView"]),
            input_classes: owned(&["android.widget.EditText"]),
            interactive_classes: owned(&["android.widget.Button"]),
            identifier_attr: "resource-id".into(),
            hint_attr: "hint".into(),
            value_attr: None,
        }
    }

    pub fn web() -> Self {
        Self {
            text_classes: owned(&["p", "span", "label", "h1", "h2", "h3"]),
            input_classes: owned(&["input", "textarea", "select"]),
            interactive_classes: owned(&["button", "a"]),
            identifier_attr: "id".into(),
            hint_attr: "placeholder".into(),
            value_attr: Some("value".into()),
        }
    }

    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Android => Self::android(),
            Platform::Web => Self::web(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Text,
    Input,
    Interactive,
}

#[derive(Debug, Clone)]
pub struct SnapshotCollector {
    profile: SnapshotProfile,
    max_nodes: usize,
}

impl SnapshotCollector {
    pub fn new(profile: SnapshotProfile, max_nodes: usize) -> Self {
        Self { profile, max_nodes }
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self::new(SnapshotProfile::for_platform(platform), DEFAULT_MAX_NODES)
    }

    pub fn profile(&self) -> &SnapshotProfile {
        &self.profile
    }

    /// Capture what the tree currently shows. Never fails.
    ///
    /// At most `max_nodes` nodes are examined per category. A node whose
    /// primary read fails is counted in `skipped`; secondary reads
    /// (identifier, hint, flags) are left empty on failure.
    pub async fn capture<B: Backend + ?Sized>(&self, backend: &mut B) -> Snapshot {
        let source = backend.page_source().await;
        if let Err(e) = &source
            && e.is_fatal()
        {
            warn!("UI tree unavailable for snapshot: {}", e);
            return Snapshot::with_capture_error(e.to_string());
        }

        let mut query_errors = Vec::new();
        let text_nodes = self
            .collect(backend, Category::Text, &mut query_errors)
            .await;
        let input_nodes = self
            .collect(backend, Category::Input, &mut query_errors)
            .await;
        let interactive_nodes = self
            .collect(backend, Category::Interactive, &mut query_errors)
            .await;

        let class_count = self.profile.text_classes.len()
            + self.profile.input_classes.len()
            + self.profile.interactive_classes.len();

        match source {
            Ok(source) => Snapshot {
                tree_size: Some(source.len()),
                text_nodes,
                input_nodes,
                interactive_nodes,
                capture_error: None,
            },
            Err(e) if query_errors.len() == class_count => {
                warn!("UI tree unavailable for snapshot: {}", e);
                Snapshot::with_capture_error(e.to_string())
            }
            Err(e) => {
                debug!("Page source unavailable, snapshot is partial: {}", e);
                Snapshot {
                    tree_size: None,
                    text_nodes,
                    input_nodes,
                    interactive_nodes,
                    capture_error: None,
                }
            }
        }
    }

    async fn collect<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        category: Category,
        query_errors: &mut Vec<BackendError>,
    ) -> NodeGroup {
        let classes = match category {
            Category::Text => &self.profile.text_classes,
            Category::Input => &self.profile.input_classes,
            Category::Interactive => &self.profile.interactive_classes,
        };

        let mut group = NodeGroup::default();
        let mut examined = 0;

        for class_name in classes {
            let handles = match backend
                .find_elements(&LocatorSpec::class(class_name.as_str(), 0))
                .await
            {
                Ok(handles) => handles,
                Err(e) => {
                    debug!("Snapshot query for {} failed: {}", class_name, e);
                    query_errors.push(e);
                    continue;
                }
            };
            group.found += handles.len();

            for handle in handles {
                if examined >= self.max_nodes {
                    break;
                }
                let index = examined;
                examined += 1;

                match self
                    .read_node(backend, category, class_name, index, &handle)
                    .await
                {
                    Ok(Some(node)) => group.nodes.push(node),
                    Ok(None) => {}
                    Err(e) => {
                        debug!("Skipping unreadable {} node: {}", class_name, e);
                        group.skipped += 1;
                    }
                }
            }
        }
        group
    }

    async fn read_node<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        category: Category,
        class_name: &str,
        index: usize,
        handle: &ElementHandle,
    ) -> Result<Option<SnapshotNode>, BackendError> {
        let text = match (category, &self.profile.value_attr) {
            (Category::Input, Some(attr)) => backend
                .element_attribute(handle, attr)
                .await?
                .unwrap_or_default(),
            _ => backend.element_text(handle).await?,
        };

        if category == Category::Text && text.trim().is_empty() {
            return Ok(None);
        }

        let identifier = backend
            .element_attribute(handle, &self.profile.identifier_attr)
            .await
            .ok()
            .flatten();

        let mut node = SnapshotNode {
            index,
            class_name: class_name.to_string(),
            identifier,
            text: Some(text),
            ..Default::default()
        };

        match category {
            Category::Text => {}
            Category::Input => {
                node.hint = backend
                    .element_attribute(handle, &self.profile.hint_attr)
                    .await
                    .ok()
                    .flatten();
            }
            Category::Interactive => {
                node.enabled = backend.is_enabled(handle).await.ok();
                node.displayed = backend.is_displayed(handle).await.ok();
            }
        }
        Ok(Some(node))
    }
}
