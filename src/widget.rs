use thiserror::Error;

use crate::platform::{DomEvent, Platform};

/// A dispatch that reached the widget but could not be handled. Dispatch failures are caught per
/// invocation and logged by the controller; they never escalate to the classified error path.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The widget has no action registered under this name (the `_<name>` convention in markup).
    #[error("no action registered for `_{0}`")]
    UnknownAction(String),

    /// The widget has no receiver method registered under this key (the `$<key>` convention).
    #[error("no receiver registered for `${0}`")]
    UnknownKey(String),

    /// The handler ran but failed.
    #[error("{0}")]
    Failed(String),
}

/// The behavior contract a bridge module fulfils.
///
/// A widget is instantiated once per `<bitty-js>` element. Instead of the markup convention's
/// string-based member access (`_name` action methods, `$key` receiver methods), a widget routes
/// dispatches explicitly: [`Widget::action`] receives the name from `data-call`/`data-c`, and
/// [`Widget::receive`] the key from `data-send`/`data-s`/`data-r`. Unhandled names should be
/// returned as the matching [`DispatchError`] variant, which the default implementations do.
pub trait Widget<P: Platform> {
    /// Hook called once after the widget is attached, before any declarative dispatches run.
    fn init(&mut self, dom: &P) {
        let _ = dom;
    }

    /// Markup appended to the element's content before `init` runs. Receiver bindings inside the
    /// markup are picked up by a rescan.
    fn template(&self) -> Option<String> {
        None
    }

    /// Resolve a batch name (`data-b`/`data-batch`) to its ordered list of update keys.
    fn batch(&self, name: &str) -> Option<Vec<String>> {
        let _ = name;
        None
    }

    /// Run the action registered under `name`. `event` is [None] for init-time dispatches.
    fn action(
        &mut self,
        name: &str,
        dom: &P,
        event: Option<&DomEvent<P::Element>>,
    ) -> Result<(), DispatchError> {
        let _ = (dom, event);
        Err(DispatchError::UnknownAction(name.to_string()))
    }

    /// Deliver the update `key` to the widget for one receiver. `target` is the element the
    /// receiver was registered on; `event` is [None] for init-time dispatches.
    fn receive(
        &mut self,
        key: &str,
        dom: &P,
        target: &P::Element,
        event: Option<&DomEvent<P::Element>>,
    ) -> Result<(), DispatchError> {
        let _ = (dom, target, event);
        Err(DispatchError::UnknownKey(key.to_string()))
    }
}
