use js_sys::Function;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::{window, Document, Element, HtmlInputElement, Window};

use super::{DomEvent, EventHandler, EventType, Platform};

/// [`Platform`] backed by the real browser globals through `web-sys`.
pub struct WebPlatform {
    window: Window,
    document: Document,
}

impl WebPlatform {
    /// Capture the browser globals. Returns [None] outside of a window context.
    pub fn new() -> Option<Self> {
        let window = window()?;
        let document = window.document()?;

        Some(Self { window, document })
    }
}

impl Platform for WebPlatform {
    type Element = Element;

    fn random_uuid(&self) -> String {
        match self.window.crypto() {
            Ok(crypto) => crypto.random_uuid(),
            // crypto is unavailable in some non-secure contexts
            Err(_) => format!("bitty-{}", js_sys::Math::random()),
        }
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<Element> {
        self.document
            .query_selector_all(tag)
            .map(node_list_to_elements)
            .unwrap_or_default()
    }

    fn marked_descendants(&self, root: &Element, keys: &[&str]) -> Vec<Element> {
        let selector = keys
            .iter()
            .map(|key| format!("[data-{key}]"))
            .collect::<Vec<_>>()
            .join(", ");

        root.query_selector_all(&selector)
            .map(node_list_to_elements)
            .unwrap_or_default()
    }

    fn data(&self, el: &Element, key: &str) -> Option<String> {
        el.get_attribute(&format!("data-{key}"))
    }

    fn set_data(&self, el: &Element, key: &str, value: &str) {
        let _ = el.set_attribute(&format!("data-{key}"), value);
    }

    fn tag_name(&self, el: &Element) -> String {
        el.tag_name().to_lowercase()
    }

    fn add_class(&self, el: &Element, class: &str) {
        let _ = el.class_list().add_1(class);
    }

    fn append_html(&self, el: &Element, markup: &str) {
        let _ = el.insert_adjacent_html("beforeend", markup);
    }

    fn inner_html(&self, el: &Element) -> String {
        el.inner_html()
    }

    fn set_inner_html(&self, el: &Element, markup: &str) {
        el.set_inner_html(markup);
    }

    fn value(&self, el: &Element) -> Option<String> {
        el.dyn_ref::<HtmlInputElement>().map(|input| input.value())
    }

    fn set_value(&self, el: &Element, value: &str) {
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
    }

    fn set_root_style(&self, property: &str, value: &str) {
        if let Some(body) = self.document.body() {
            let _ = body.style().set_property(property, value);
        }
    }

    fn listen(&self, el: &Element, event_type: &EventType, handler: EventHandler<Element>) {
        let registered = event_type.clone();

        // Hand the closure over to JS for the lifetime of the page.
        let listener: Function = Closure::<dyn Fn(web_sys::Event)>::new(move |event: web_sys::Event| {
            let Some(target) = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
            else {
                return;
            };

            handler(DomEvent {
                event_type: registered.clone(),
                target,
            });
        })
        .into_js_value()
        .unchecked_into();

        let _ = el.add_event_listener_with_callback(event_type.as_str(), &listener);
    }

    fn storage_get(&self, key: &str) -> Option<String> {
        self.window
            .local_storage()
            .ok()
            .flatten()?
            .get_item(key)
            .ok()
            .flatten()
    }

    fn storage_set(&self, key: &str, value: &str) {
        if let Ok(Some(storage)) = self.window.local_storage() {
            let _ = storage.set_item(key, value);
        }
    }

    fn report_error(&self, text: &str) {
        web_sys::console::error_1(&JsValue::from_str(text));
    }
}

fn node_list_to_elements(nodes: web_sys::NodeList) -> Vec<Element> {
    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}
