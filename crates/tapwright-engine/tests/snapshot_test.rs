mod common;

use common::{MockBackend, MockElement};
use tapwright_engine::backend::BackendError;
use tapwright_engine::protocol::Platform;
use tapwright_engine::snapshot::{SnapshotCollector, SnapshotProfile};

fn collector() -> SnapshotCollector {
    SnapshotCollector::for_platform(Platform::Android)
}

#[tokio::test]
async fn test_large_tree_is_bounded() {
    let elements = (0..1000)
        .map(|i| MockElement::text_view(&format!("row {}", i)))
        .collect();
    let mut backend = MockBackend::new(elements);

    let snapshot = collector().capture(&mut backend).await;

    assert_eq!(snapshot.text_nodes.found, 1000);
    assert_eq!(snapshot.text_nodes.nodes.len(), 10);
    assert_eq!(snapshot.text_nodes.nodes[0].text.as_deref(), Some("row 0"));
    assert!(snapshot.capture_error.is_none());
}

#[tokio::test]
async fn test_unreadable_nodes_are_skipped() {
    let mut elements: Vec<MockElement> = (0..1000)
        .map(|i| MockElement::text_view(&format!("row {}", i)))
        .collect();
    for element in elements.iter_mut().step_by(2) {
        element.unreadable = true;
    }
    let mut backend = MockBackend::new(elements);

    let snapshot = collector().capture(&mut backend).await;

    assert_eq!(snapshot.text_nodes.nodes.len(), 5);
    assert_eq!(snapshot.text_nodes.skipped, 5);
    assert!(snapshot.text_nodes.nodes.len() <= 10);
}

#[tokio::test]
async fn test_categories_and_flags() {
    let mut backend = MockBackend::new(vec![
        MockElement::text_view("Create account"),
        MockElement::text_view(""),
        MockElement::edit_text("app:id/etCompanyName", "Company name"),
        MockElement::edit_text("app:id/etPhoneNumber", "Phone number").text("0812"),
        MockElement::button("app:id/btnNext", "Next").disabled(),
    ]);

    let snapshot = collector().capture(&mut backend).await;

    assert!(snapshot.tree_size.is_some_and(|n| n > 0));

    // Empty text views are not listed.
    assert_eq!(snapshot.text_nodes.found, 2);
    assert_eq!(snapshot.text_nodes.nodes.len(), 1);

    let inputs = &snapshot.input_nodes.nodes;
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].hint.as_deref(), Some("Company name"));
    assert_eq!(inputs[1].text.as_deref(), Some("0812"));
    assert_eq!(inputs[1].identifier.as_deref(), Some("app:id/etPhoneNumber"));

    let buttons = &snapshot.interactive_nodes.nodes;
    assert_eq!(buttons.len(), 1);
    assert_eq!(buttons[0].enabled, Some(false));
    assert_eq!(buttons[0].displayed, Some(true));
}

#[tokio::test]
async fn test_dead_session_yields_capture_error() {
    let mut backend = MockBackend::new(vec![MockElement::text_view("hello")]);
    backend.connection_lost = true;

    let snapshot = collector().capture(&mut backend).await;

    assert!(snapshot.is_empty());
    assert_eq!(
        snapshot.capture_error,
        Some(BackendError::ConnectionLost.to_string())
    );
}

#[tokio::test]
async fn test_missing_page_source_still_lists_nodes() {
    let mut backend = MockBackend::new(vec![MockElement::text_view("hello")]);
    backend.page_source_error = Some(BackendError::ScriptError("dump failed".into()));

    let snapshot = collector().capture(&mut backend).await;

    assert!(snapshot.tree_size.is_none());
    assert!(snapshot.capture_error.is_none());
    assert_eq!(snapshot.text_nodes.nodes.len(), 1);
}

#[tokio::test]
async fn test_custom_profile_and_bound() {
    let mut profile = SnapshotProfile::web();
    profile.text_classes = vec!["android.widget.TextView".into()];
    let collector = SnapshotCollector::new(profile, 3);
    let elements = (0..20)
        .map(|i| MockElement::text_view(&format!("t{}", i)))
        .collect();
    let mut backend = MockBackend::new(elements);

    let snapshot = collector.capture(&mut backend).await;
    assert_eq!(snapshot.text_nodes.nodes.len(), 3);
    assert_eq!(snapshot.text_nodes.found, 20);
}
