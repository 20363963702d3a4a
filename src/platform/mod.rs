mod memory;
mod web;

pub use memory::{MemoryElement, MemoryPlatform};
pub use web::WebPlatform;

use std::rc::Rc;

/// A DOM event type observed by a controller. The default set is [`EventType::Click`] and
/// [`EventType::Input`]; markup can swap in any other type via `data-listeners`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    Input,
    Other(String),
}

impl EventType {
    /// The event name used when registering JS listeners.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Click => "click",
            EventType::Input => "input",
            EventType::Other(name) => name,
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "click" => EventType::Click,
            "input" => EventType::Input,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event as delivered to a controller: the type it was registered under, and the element the
/// event originated from (the target after bubbling, not the element the listener is attached to).
#[derive(Debug, Clone)]
pub struct DomEvent<El> {
    pub event_type: EventType,
    pub target: El,
}

/// Callback invoked by the platform when a listened event fires.
pub type EventHandler<El> = Rc<dyn Fn(DomEvent<El>)>;

/// The capabilities a controller needs from its host environment.
///
/// Everything the browser normally provides as a global (`document`, `localStorage`,
/// `self.crypto`, `console.error`) is reached through this trait, so the controller and widgets
/// run unchanged against [`WebPlatform`] in the browser and [`MemoryPlatform`] in native tests.
pub trait Platform {
    /// Handle to one element in the host's tree.
    type Element: Clone + PartialEq + 'static;

    /// Mint a fresh unique identifier.
    fn random_uuid(&self) -> String;

    /// Every element in the document with the given tag name, in document order.
    fn elements_by_tag(&self, tag: &str) -> Vec<Self::Element>;

    /// Descendants of `root` (excluding `root` itself) carrying any `data-<key>` attribute from
    /// `keys`, in document order.
    fn marked_descendants(&self, root: &Self::Element, keys: &[&str]) -> Vec<Self::Element>;

    /// Read the `data-<key>` attribute.
    fn data(&self, el: &Self::Element, key: &str) -> Option<String>;

    /// Write the `data-<key>` attribute.
    fn set_data(&self, el: &Self::Element, key: &str, value: &str);

    /// Lowercase tag name of the element.
    fn tag_name(&self, el: &Self::Element) -> String;

    fn add_class(&self, el: &Self::Element, class: &str);

    /// Append parsed markup to the element's content.
    fn append_html(&self, el: &Self::Element, markup: &str);

    fn inner_html(&self, el: &Self::Element) -> String;

    fn set_inner_html(&self, el: &Self::Element, markup: &str);

    /// Current form value of the element, if it has one.
    fn value(&self, el: &Self::Element) -> Option<String>;

    fn set_value(&self, el: &Self::Element, value: &str);

    /// Set a style property on the document root (the body element in the browser).
    fn set_root_style(&self, property: &str, value: &str);

    /// Register `handler` for events of `event_type` on the element. Events fired on descendants
    /// reach the handler through bubbling, with the descendant as the event target.
    fn listen(&self, el: &Self::Element, event_type: &EventType, handler: EventHandler<Self::Element>);

    fn storage_get(&self, key: &str) -> Option<String>;

    fn storage_set(&self, key: &str, value: &str);

    /// Emit a diagnostic to the host's error channel (`console.error` in the browser).
    fn report_error(&self, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_through_names() {
        assert_eq!(EventType::from("click"), EventType::Click);
        assert_eq!(EventType::from("input"), EventType::Input);
        assert_eq!(
            EventType::from("keyup"),
            EventType::Other("keyup".to_string())
        );
        assert_eq!(EventType::Other("keyup".to_string()).as_str(), "keyup");
    }
}
