//! bitty: a small framework where an HTML tag declares, through data attributes, which widget
//! module supplies its behavior, and DOM events are wired to that widget by naming convention.
//!
//! A [`Controller`] attaches to each `<bitty-js>` element, resolves its `data-bridge` path
//! through a [`WidgetLoader`], and routes `data-c`/`data-s`/`data-b` events into the loaded
//! [`Widget`]. All browser access goes through a [`Platform`] capability object, so the whole
//! dispatch pipeline also runs headless against [`MemoryPlatform`].

mod controller;
mod dispatch;
mod error;
mod loader;
mod platform;
mod util;
mod widget;
mod zoom;

pub use controller::{Controller, ControllerRef, TAG};
pub use error::{
    lookup, ElementDetails, ErrorContext, ErrorReport, ErrorSpec, COMPONENT_ERROR_CLASS,
    ELEMENT_ERROR_CLASS,
};
pub use loader::{LoadError, WidgetFactory, WidgetLoader, WidgetRegistry};
pub use platform::{
    DomEvent, EventHandler, EventType, MemoryElement, MemoryPlatform, Platform, WebPlatform,
};
pub use widget::{DispatchError, Widget};
pub use zoom::Zoom;

use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// Attach a controller to every `<bitty-js>` element the platform can see. Elements that fail to
/// attach are marked and reported individually; the rest continue unaffected.
pub fn boot<P>(platform: Rc<P>, loader: Rc<dyn WidgetLoader<P>>) -> Vec<ControllerRef<P>>
where
    P: Platform + 'static,
{
    platform
        .elements_by_tag(TAG)
        .into_iter()
        .map(|element| Controller::attach(Rc::clone(&platform), Rc::clone(&loader), element))
        .collect()
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Configure the panic hook to log to console.error
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));

    Ok(())
}
