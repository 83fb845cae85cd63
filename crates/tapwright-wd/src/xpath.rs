//! Locator to XPath translation.
//!
//! Both Appium (UiAutomator2 hierarchy) and browser drivers accept XPath, so
//! every element strategy becomes one expression. Attribute names differ per
//! platform: Android exposes `resource-id` and `text`, the DOM exposes `id`
//! and text nodes.

use tapwright_engine::backend::BackendError;
use tapwright_engine::protocol::{LocatorSpec, Platform};

/// Quote `value` as an XPath 1.0 string literal.
pub fn literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }

    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn is_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        && !name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
}

fn checked_name(name: &str) -> Result<&str, BackendError> {
    if is_name(name) {
        Ok(name)
    } else {
        Err(BackendError::SelectorInvalid {
            selector: name.to_string(),
        })
    }
}

/// Translate one element strategy. `Class` yields every element of the class;
/// the caller picks the index.
pub fn to_xpath(platform: Platform, locator: &LocatorSpec) -> Result<String, BackendError> {
    let id_attr = match platform {
        Platform::Android => "resource-id",
        Platform::Web => "id",
    };

    let xpath = match (platform, locator) {
        (_, LocatorSpec::Identifier(id)) => format!("//*[@{}={}]", id_attr, literal(id)),
        (_, LocatorSpec::AttributeContains { attr, substring }) => format!(
            "//*[contains(@{}, {})]",
            checked_name(attr)?,
            literal(substring)
        ),
        (Platform::Android, LocatorSpec::TextEquals(text)) => {
            format!("//*[@text={}]", literal(text))
        }
        (Platform::Android, LocatorSpec::TextContains(text)) => {
            format!("//*[contains(@text, {})]", literal(text))
        }
        (Platform::Web, LocatorSpec::TextEquals(text)) => {
            format!("//*[text()[normalize-space(.)={}]]", literal(text.trim()))
        }
        (Platform::Web, LocatorSpec::TextContains(text)) => {
            format!("//*[text()[contains(., {})]]", literal(text))
        }
        (_, LocatorSpec::Class { class_name, .. }) => format!("//{}", checked_name(class_name)?),
        (_, LocatorSpec::Coordinate { .. }) => {
            return Err(BackendError::NotSupported(
                "coordinates have no XPath form".into(),
            ));
        }
    };
    Ok(xpath)
}
