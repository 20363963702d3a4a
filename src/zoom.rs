//! Example widget: a font-size slider and an editable text block, both persisted to the
//! platform's key/value storage.
//!
//! Markup wiring, for reference:
//!
//! ```html
//! <bitty-js data-bridge="./zoom.js" data-send="initSlider|initText" data-call="applySize">
//!   <input type="range" data-r="initSlider" data-c="updateSize|applySize">
//!   <p contenteditable data-r="initText" data-c="saveText"></p>
//! </bitty-js>
//! ```

use crate::{
    platform::{DomEvent, Platform},
    widget::{DispatchError, Widget},
};

pub const FONT_SIZE_KEY: &str = "zoom-font-size";
pub const TEXT_KEY: &str = "zoom-text";

const DEFAULT_FONT_SIZE: f64 = 1.4;
const DEFAULT_TEXT: &str = "Edit me...";

pub struct Zoom {
    font_size: f64,
    text: String,
}

impl Zoom {
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn event_target<'a, P: Platform>(
        event: Option<&'a DomEvent<P::Element>>,
        action: &str,
    ) -> Result<&'a P::Element, DispatchError> {
        event
            .map(|event| &event.target)
            .ok_or_else(|| DispatchError::Failed(format!("{action} needs an event target")))
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            text: DEFAULT_TEXT.to_string(),
        }
    }
}

impl<P: Platform> Widget<P> for Zoom {
    fn init(&mut self, dom: &P) {
        self.font_size = dom
            .storage_get(FONT_SIZE_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_FONT_SIZE);
        self.text = dom
            .storage_get(TEXT_KEY)
            .unwrap_or_else(|| DEFAULT_TEXT.to_string());
    }

    fn receive(
        &mut self,
        key: &str,
        dom: &P,
        target: &P::Element,
        _event: Option<&DomEvent<P::Element>>,
    ) -> Result<(), DispatchError> {
        match key {
            "initSlider" => dom.set_value(target, &self.font_size.to_string()),
            "initText" => dom.set_inner_html(target, &self.text),
            other => return Err(DispatchError::UnknownKey(other.to_string())),
        }

        Ok(())
    }

    fn action(
        &mut self,
        name: &str,
        dom: &P,
        event: Option<&DomEvent<P::Element>>,
    ) -> Result<(), DispatchError> {
        match name {
            "applySize" => {
                dom.set_root_style("--font-size", &format!("{}rem", self.font_size));
            }
            "updateSize" => {
                let target = Self::event_target::<P>(event, name)?;
                let raw = dom
                    .value(target)
                    .ok_or_else(|| DispatchError::Failed("event target has no value".to_string()))?;
                let value: f64 = raw
                    .parse()
                    .map_err(|_| DispatchError::Failed(format!("not a font size: {raw}")))?;

                dom.storage_set(FONT_SIZE_KEY, &value.to_string());
                self.font_size = value;
            }
            "saveText" => {
                let target = Self::event_target::<P>(event, name)?;
                dom.storage_set(TEXT_KEY, &dom.inner_html(target));
            }
            other => return Err(DispatchError::UnknownAction(other.to_string())),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::{Controller, TAG},
        loader::{WidgetLoader, WidgetRegistry},
        platform::{EventType, MemoryElement, MemoryPlatform},
    };
    use std::rc::Rc;

    struct ZoomPage {
        platform: Rc<MemoryPlatform>,
        slider: MemoryElement,
        text: MemoryElement,
        root: MemoryElement,
    }

    fn zoom_page() -> ZoomPage {
        let platform = Rc::new(MemoryPlatform::new());
        let root = platform.create_element(TAG);
        platform.set_data(&root, "bridge", "./zoom.js");
        platform.set_data(&root, "send", "initSlider|initText");
        platform.set_data(&root, "call", "applySize");

        let slider = platform.create_child(root, "input");
        platform.set_data(&slider, "r", "initSlider");
        platform.set_data(&slider, "c", "updateSize|applySize");

        let text = platform.create_child(root, "p");
        platform.set_data(&text, "r", "initText");
        platform.set_data(&text, "c", "saveText");

        ZoomPage {
            platform,
            slider,
            text,
            root,
        }
    }

    fn mount(page: &ZoomPage) {
        let mut registry = WidgetRegistry::new();
        registry.register_default("./zoom.js", Zoom::default);
        let loader: Rc<dyn WidgetLoader<MemoryPlatform>> = Rc::new(registry);

        Controller::attach(Rc::clone(&page.platform), loader, page.root);
    }

    #[test]
    fn fresh_init_exposes_defaults() {
        let platform = MemoryPlatform::new();
        let mut zoom = Zoom::default();

        zoom.init(&platform);

        assert_eq!(zoom.text(), "Edit me...");
        assert!((zoom.font_size() - 1.4).abs() < f64::EPSILON);
    }

    #[test]
    fn mounting_renders_stored_state_into_the_page() {
        let page = zoom_page();

        mount(&page);

        assert_eq!(page.platform.value(&page.slider), Some("1.4".to_string()));
        assert_eq!(page.platform.inner_html(&page.text), "Edit me...");
        assert_eq!(
            page.platform.root_style("--font-size"),
            Some("1.4rem".to_string())
        );
    }

    #[test]
    fn slider_input_round_trips_through_storage() {
        let page = zoom_page();
        mount(&page);

        page.platform.set_value(&page.slider, "2.1");
        page.platform.fire(page.slider, EventType::Input);

        assert_eq!(
            page.platform.storage_get(FONT_SIZE_KEY),
            Some("2.1".to_string())
        );
        assert_eq!(
            page.platform.root_style("--font-size"),
            Some("2.1rem".to_string())
        );

        // A fresh initialization reads the stored value back, not the default.
        let mut fresh = Zoom::default();
        fresh.init(page.platform.as_ref());
        assert!((fresh.font_size() - 2.1).abs() < f64::EPSILON);
    }

    #[test]
    fn edited_text_persists_and_reloads() {
        let page = zoom_page();
        mount(&page);

        page.platform.set_inner_html(&page.text, "hello there");
        page.platform.fire(page.text, EventType::Input);

        assert_eq!(
            page.platform.storage_get(TEXT_KEY),
            Some("hello there".to_string())
        );

        let mut fresh = Zoom::default();
        fresh.init(page.platform.as_ref());
        assert_eq!(fresh.text(), "hello there");
    }

    #[test]
    fn non_numeric_slider_value_keeps_previous_size() {
        let page = zoom_page();
        mount(&page);

        page.platform.set_value(&page.slider, "not-a-number");
        page.platform.fire(page.slider, EventType::Input);

        assert_eq!(page.platform.storage_get(FONT_SIZE_KEY), None);
        // applySize still ran with the previous size.
        assert_eq!(
            page.platform.root_style("--font-size"),
            Some("1.4rem".to_string())
        );
        assert!(page
            .platform
            .reports()
            .iter()
            .any(|report| report.contains("Tried: _updateSize")));
    }
}
