use std::{cell::RefCell, rc::Rc};

use tracing::{debug, warn};

use crate::{
    dispatch::{pipe_list, IgnoreList, ReceiverSet},
    error::{
        ElementDetails, ErrorContext, ErrorReport, COMPONENT_ERROR_CLASS, ELEMENT_ERROR_CLASS,
    },
    loader::{LoadError, WidgetLoader},
    platform::{DomEvent, EventType, Platform},
    widget::Widget,
};

/// The tag name controllers attach to.
pub const TAG: &str = "bitty-js";

/// Dataset keys that mark descendants for identifier assignment.
const MARKER_KEYS: [&str; 7] = ["r", "c", "s", "call", "send", "b", "batch"];

/// Event types observed when markup doesn't override them via `data-listeners`.
const DEFAULT_LISTENERS: [EventType; 2] = [EventType::Click, EventType::Input];

/// Shared reference to a [`Controller`], as held by event closures.
pub type ControllerRef<P> = Rc<RefCell<Controller<P>>>;

/// Manages one `<bitty-js>` element: identifier assignment, widget loading, receiver
/// registration, event listening and dispatch.
///
/// After [`Controller::attach`] the controller either holds a widget instance or is in an error
/// state; it is never in both.
pub struct Controller<P: Platform> {
    platform: Rc<P>,
    loader: Rc<dyn WidgetLoader<P>>,
    element: P::Element,
    widget: Option<Box<dyn Widget<P>>>,
    receivers: ReceiverSet<P::Element>,
    listeners: Vec<EventType>,
    error_id: Option<u16>,
}

impl<P> Controller<P>
where
    P: Platform + 'static,
{
    /// Attach a controller to `element`. This is the custom element's connected callback:
    /// identifiers are assigned, the widget is loaded through `loader`, receivers are scanned,
    /// the widget is initialised and event listeners are installed. Classified failures mark the
    /// element and report to the platform's error channel; nothing is thrown to the caller.
    pub fn attach(
        platform: Rc<P>,
        loader: Rc<dyn WidgetLoader<P>>,
        element: P::Element,
    ) -> ControllerRef<P> {
        let controller = Rc::new(RefCell::new(Self {
            platform,
            loader,
            element,
            widget: None,
            receivers: ReceiverSet::new(),
            listeners: DEFAULT_LISTENERS.to_vec(),
            error_id: None,
        }));

        {
            let mut this = controller.borrow_mut();
            this.assign_ids();
            this.attach_widget();

            if this.widget.is_some() {
                this.load_receivers();
                this.init();
            } else if this.error_id.is_none() {
                this.classify_error(0, None, None);
            }
        }

        // Only a controller that holds a widget exposes behavior.
        if controller.borrow().widget.is_some() {
            Self::add_event_listeners(&controller);
        }

        controller
    }

    /// The element this controller is bound to.
    pub fn element(&self) -> &P::Element {
        &self.element
    }

    pub fn has_widget(&self) -> bool {
        self.widget.is_some()
    }

    /// The classified error id raised during attachment, if any.
    pub fn error_id(&self) -> Option<u16> {
        self.error_id
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Raise a classified error: the element is marked with the error classes and a report is
    /// assembled and sent to the platform's error channel.
    pub fn classify_error(
        &mut self,
        id: u16,
        element: Option<&P::Element>,
        additional_details: Option<String>,
    ) {
        self.fail(id, None, element, additional_details);
    }

    fn fail(
        &mut self,
        id: u16,
        module_path: Option<&str>,
        element: Option<&P::Element>,
        additional_details: Option<String>,
    ) {
        self.error_id = Some(id);
        self.platform.add_class(&self.element, COMPONENT_ERROR_CLASS);
        if element.is_some() {
            self.platform.add_class(&self.element, ELEMENT_ERROR_CLASS);
        }

        let mut ctx = ErrorContext::new(
            id,
            self.platform.data(&self.element, "uuid").unwrap_or_default(),
        );
        if let Some(path) = module_path {
            ctx = ctx.with_module_path(path);
        }
        if let Some(el) = element {
            ctx = ctx.with_element(ElementDetails {
                tag: self.platform.tag_name(el),
                uuid: self.platform.data(el, "uuid").unwrap_or_default(),
            });
        }
        if let Some(details) = additional_details {
            ctx = ctx.with_additional_details(details);
        }

        let report = ErrorReport::new(&ctx);
        self.platform.report_error(&report.to_console_text());
    }

    /// Assign a `data-uuid` to the element and to every marked descendant that doesn't carry one
    /// yet. Re-attachment never overwrites an existing identifier.
    fn assign_ids(&self) {
        self.ensure_uuid(&self.element);

        for el in self.platform.marked_descendants(&self.element, &MARKER_KEYS) {
            self.ensure_uuid(&el);
        }
    }

    fn ensure_uuid(&self, el: &P::Element) {
        if self.platform.data(el, "uuid").is_none() {
            let uuid = self.platform.random_uuid();
            debug!(uuid = %uuid, tag = %self.platform.tag_name(el), "assigning identifier");
            self.platform.set_data(el, "uuid", &uuid);
        }
    }

    fn attach_widget(&mut self) {
        let Some(bridge) = self.platform.data(&self.element, "bridge") else {
            self.fail(2, None, None, None);
            return;
        };

        // `data-widget` selects a named export; `data-app` is the older alias.
        let export = self
            .platform
            .data(&self.element, "widget")
            .or_else(|| self.platform.data(&self.element, "app"));

        match self.loader.load(&bridge, export.as_deref()) {
            Ok(widget) => self.widget = Some(widget),
            // A known module without a default export leaves the widget undefined; the
            // occurrence is unclassified but the loader's message is carried along.
            Err(err @ LoadError::NoDefaultExport(_)) => {
                self.fail(0, Some(&bridge), None, Some(err.to_string()));
            }
            Err(err @ LoadError::ModuleNotFound(_)) => {
                let id = if export.is_some() { 4 } else { 3 };
                self.fail(id, Some(&bridge), None, Some(err.to_string()));
            }
            Err(err @ LoadError::NoSuchExport(..)) => {
                self.fail(4, Some(&bridge), None, Some(err.to_string()));
            }
        }
    }

    fn init(&mut self) {
        if let Some(markup) = self.widget.as_ref().and_then(|widget| widget.template()) {
            self.platform.append_html(&self.element, &markup);
            // The template may have introduced new receiver bindings.
            self.load_receivers();
        }

        if let Some(widget) = self.widget.as_mut() {
            widget.init(self.platform.as_ref());
        }

        if let Some(raw) = self.platform.data(&self.element, "call") {
            self.run_actions(&raw, None);
        }
        if let Some(raw) = self.platform.data(&self.element, "send") {
            self.send_updates(&raw, None);
        }
        if let Some(name) = self.platform.data(&self.element, "batch") {
            self.send_batch(&name, None);
        }

        if let Some(raw) = self.platform.data(&self.element, "listeners") {
            self.listeners = pipe_list(&raw).map(EventType::from).collect();
        }
    }

    fn add_event_listeners(controller: &ControllerRef<P>) {
        let (platform, element, listeners) = {
            let this = controller.borrow();
            (
                Rc::clone(&this.platform),
                this.element.clone(),
                this.listeners.clone(),
            )
        };

        for event_type in listeners {
            let controller = Rc::clone(controller);
            platform.listen(
                &element,
                &event_type,
                Rc::new(move |event| {
                    controller.borrow_mut().handle_change(&event);
                }),
            );
        }
    }

    /// Route one DOM event by the target element's dispatch attributes.
    fn handle_change(&mut self, event: &DomEvent<P::Element>) {
        if let Some(raw) = self.platform.data(&event.target, "c") {
            self.run_actions(&raw, Some(event));
        }
        if let Some(name) = self.platform.data(&event.target, "b") {
            self.send_batch(&name, Some(event));
        }
        if let Some(raw) = self.platform.data(&event.target, "s") {
            self.send_updates(&raw, Some(event));
        }
    }

    /// Rebuild the receiver table from the current subtree.
    fn load_receivers(&mut self) {
        debug!("loading receivers");
        self.receivers.clear();

        for el in self.platform.marked_descendants(&self.element, &["r"]) {
            if let Some(raw) = self.platform.data(&el, "r") {
                for key in pipe_list(&raw) {
                    self.receivers.register(key, el.clone());
                }
            }
        }
    }

    /// Invoke the widget action for each name in the pipe-delimited list. Failures are caught
    /// per name and logged, so one failing action doesn't block its siblings.
    fn run_actions(&mut self, raw: &str, event: Option<&DomEvent<P::Element>>) {
        let ignored = self.ignore_list();
        let Some(widget) = self.widget.as_mut() else {
            return;
        };

        for name in pipe_list(raw) {
            if ignored.contains(name) {
                continue;
            }

            if let Err(err) = widget.action(name, self.platform.as_ref(), event) {
                warn!(action = name, "action dispatch failed: {err}");
                self.platform.report_error(&format!("{err}\nTried: _{name}"));
            }
        }
    }

    /// Dispatch each update key to every receiver registered under it, in registration order.
    /// Receiver failures are caught individually.
    fn send_updates(&mut self, raw: &str, event: Option<&DomEvent<P::Element>>) {
        let ignored = self.ignore_list();

        for key in pipe_list(raw) {
            if ignored.contains(key) {
                continue;
            }

            let targets = self.receivers.matching(key).to_vec();
            let Some(widget) = self.widget.as_mut() else {
                return;
            };

            for target in &targets {
                if let Err(err) = widget.receive(key, self.platform.as_ref(), target, event) {
                    warn!(key, "receiver dispatch failed: {err}");
                    self.platform.report_error(&format!("{err}\nTried: ${key}"));
                }
            }
        }
    }

    /// Expand a named batch through the widget and dispatch it as updates.
    fn send_batch(&mut self, name: &str, event: Option<&DomEvent<P::Element>>) {
        let Some(keys) = self.widget.as_ref().and_then(|widget| widget.batch(name)) else {
            warn!(batch = name, "no batch registered under this name");
            return;
        };

        self.send_updates(&keys.join("|"), event);
    }

    /// Names the element's own `data-ignore` exempts from dispatch.
    fn ignore_list(&self) -> IgnoreList {
        IgnoreList::parse(self.platform.data(&self.element, "ignore"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        loader::WidgetRegistry,
        platform::{MemoryElement, MemoryPlatform},
        widget::DispatchError,
    };

    const BRIDGE: &str = "./probe.js";

    /// Records every dispatch it sees.
    struct Probe {
        log: Rc<RefCell<Vec<String>>>,
        template: Option<String>,
    }

    impl Widget<MemoryPlatform> for Probe {
        fn template(&self) -> Option<String> {
            self.template.clone()
        }

        fn batch(&self, name: &str) -> Option<Vec<String>> {
            (name == "pair").then(|| vec!["a".to_string(), "b".to_string()])
        }

        fn action(
            &mut self,
            name: &str,
            _dom: &MemoryPlatform,
            _event: Option<&DomEvent<MemoryElement>>,
        ) -> Result<(), DispatchError> {
            if name == "broken" {
                return Err(DispatchError::Failed("boom".to_string()));
            }
            self.log.borrow_mut().push(format!("_{name}"));
            Ok(())
        }

        fn receive(
            &mut self,
            key: &str,
            dom: &MemoryPlatform,
            target: &MemoryElement,
            event: Option<&DomEvent<MemoryElement>>,
        ) -> Result<(), DispatchError> {
            let uuid = dom.data(target, "uuid").unwrap_or_default();
            let via = if event.is_some() { "event" } else { "init" };
            self.log.borrow_mut().push(format!("${key}:{uuid}:{via}"));
            Ok(())
        }
    }

    struct Fixture {
        platform: Rc<MemoryPlatform>,
        loader: Rc<dyn WidgetLoader<MemoryPlatform>>,
        log: Rc<RefCell<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        fixture_with_template(None)
    }

    fn fixture_with_template(template: Option<&str>) -> Fixture {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WidgetRegistry::new();

        let factory_log = Rc::clone(&log);
        let template = template.map(str::to_string);
        registry.register_default(BRIDGE, move || Probe {
            log: Rc::clone(&factory_log),
            template: template.clone(),
        });

        Fixture {
            platform: Rc::new(MemoryPlatform::new()),
            loader: Rc::new(registry),
            log,
        }
    }

    fn bitty_root(fixture: &Fixture) -> MemoryElement {
        let root = fixture.platform.create_element(TAG);
        fixture.platform.set_data(&root, "bridge", BRIDGE);
        root
    }

    fn attach(fixture: &Fixture, root: MemoryElement) -> ControllerRef<MemoryPlatform> {
        Controller::attach(
            Rc::clone(&fixture.platform),
            Rc::clone(&fixture.loader),
            root,
        )
    }

    #[test]
    fn missing_bridge_classifies_error_2() {
        let fixture = fixture();
        let root = fixture.platform.create_element(TAG);

        let controller = attach(&fixture, root);

        assert_eq!(controller.borrow().error_id(), Some(2));
        assert!(!controller.borrow().has_widget());
        assert!(fixture
            .platform
            .classes(root)
            .contains(&COMPONENT_ERROR_CLASS.to_string()));
        let reports = fixture.platform.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("A BITTY ERROR OCCURRED [ID: 2]"));
    }

    #[test]
    fn missing_default_export_classifies_error_0() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let factory_log = Rc::clone(&log);
        // Named export only; no default registered under the bridge path.
        registry.register(BRIDGE, "Probe", move || Probe {
            log: Rc::clone(&factory_log),
            template: None,
        });
        let fixture = Fixture {
            platform: Rc::new(MemoryPlatform::new()),
            loader: Rc::new(registry),
            log,
        };
        let root = bitty_root(&fixture);

        let controller = attach(&fixture, root);

        assert_eq!(controller.borrow().error_id(), Some(0));
        assert!(!controller.borrow().has_widget());
        assert!(fixture.platform.reports()[0].contains("[ID: 0]"));
    }

    #[test]
    fn unknown_module_classifies_error_3_for_default_and_4_for_named() {
        let fixture = fixture();

        let default_root = fixture.platform.create_element(TAG);
        fixture
            .platform
            .set_data(&default_root, "bridge", "./missing.js");
        let controller = attach(&fixture, default_root);
        assert_eq!(controller.borrow().error_id(), Some(3));

        let named_root = fixture.platform.create_element(TAG);
        fixture
            .platform
            .set_data(&named_root, "bridge", "./missing.js");
        fixture.platform.set_data(&named_root, "widget", "Probe");
        let controller = attach(&fixture, named_root);
        assert_eq!(controller.borrow().error_id(), Some(4));

        let reports = fixture.platform.reports();
        assert!(reports[0].contains("./missing.js"));
        assert!(reports[1].contains("Could not load widget"));
    }

    #[test]
    fn named_export_is_selected_by_data_widget_or_data_app() {
        for attribute in ["widget", "app"] {
            let log = Rc::new(RefCell::new(Vec::new()));
            let mut registry = WidgetRegistry::new();
            let factory_log = Rc::clone(&log);
            registry.register(BRIDGE, "Probe", move || Probe {
                log: Rc::clone(&factory_log),
                template: None,
            });
            let fixture = Fixture {
                platform: Rc::new(MemoryPlatform::new()),
                loader: Rc::new(registry),
                log,
            };
            let root = bitty_root(&fixture);
            fixture.platform.set_data(&root, attribute, "Probe");

            let controller = attach(&fixture, root);

            assert!(controller.borrow().has_widget(), "via data-{attribute}");
            assert_eq!(controller.borrow().error_id(), None);
        }
    }

    #[test]
    fn marked_descendants_get_ids_and_reattachment_keeps_them() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        let marked = fixture.platform.create_child(root, "input");
        fixture.platform.set_data(&marked, "r", "a");
        let unmarked = fixture.platform.create_child(root, "div");

        attach(&fixture, root);

        let root_uuid = fixture.platform.data(&root, "uuid");
        let marked_uuid = fixture.platform.data(&marked, "uuid");
        assert!(root_uuid.as_deref().is_some_and(|uuid| !uuid.is_empty()));
        assert!(marked_uuid.as_deref().is_some_and(|uuid| !uuid.is_empty()));
        assert_eq!(fixture.platform.data(&unmarked, "uuid"), None);

        attach(&fixture, root);

        assert_eq!(fixture.platform.data(&root, "uuid"), root_uuid);
        assert_eq!(fixture.platform.data(&marked, "uuid"), marked_uuid);
    }

    #[test]
    fn send_fans_out_to_matching_receivers_in_scan_order() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "send", "a|b");
        let first = fixture.platform.create_child(root, "p");
        fixture.platform.set_data(&first, "r", "a");
        let second = fixture.platform.create_child(root, "p");
        fixture.platform.set_data(&second, "r", "a");
        let third = fixture.platform.create_child(root, "p");
        fixture.platform.set_data(&third, "r", "b");

        attach(&fixture, root);

        let expected: Vec<String> = [(first, "a"), (second, "a"), (third, "b")]
            .iter()
            .map(|(el, key)| {
                format!(
                    "${key}:{}:init",
                    fixture.platform.data(el, "uuid").unwrap()
                )
            })
            .collect();
        assert_eq!(*fixture.log.borrow(), expected);
    }

    #[test]
    fn ignored_names_are_skipped_for_calls_and_sends() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "ignore", "x|a");
        let button = fixture.platform.create_child(root, "button");
        fixture.platform.set_data(&button, "c", "x|y");
        let receiver = fixture.platform.create_child(root, "p");
        fixture.platform.set_data(&receiver, "r", "a|b");
        fixture.platform.set_data(&receiver, "s", "a|b");

        attach(&fixture, root);
        fixture.platform.fire(button, EventType::Click);
        fixture.platform.fire(receiver, EventType::Click);

        let log = fixture.log.borrow();
        assert_eq!(log[0], "_y");
        assert_eq!(log.len(), 2);
        assert!(log[1].starts_with("$b:"));
    }

    #[test]
    fn init_dispatches_calls_sends_and_batches() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "call", "one|two");
        fixture.platform.set_data(&root, "batch", "pair");
        let receiver = fixture.platform.create_child(root, "p");
        fixture.platform.set_data(&receiver, "r", "a|b");

        attach(&fixture, root);

        let uuid = fixture.platform.data(&receiver, "uuid").unwrap();
        assert_eq!(
            *fixture.log.borrow(),
            vec![
                "_one".to_string(),
                "_two".to_string(),
                format!("$a:{uuid}:init"),
                format!("$b:{uuid}:init"),
            ]
        );
    }

    #[test]
    fn unknown_batch_is_logged_and_skipped() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "batch", "nope");

        let controller = attach(&fixture, root);

        assert!(controller.borrow().has_widget());
        assert!(fixture.log.borrow().is_empty());
    }

    #[test]
    fn listened_events_route_through_target_attributes() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        let button = fixture.platform.create_child(root, "button");
        fixture.platform.set_data(&button, "c", "act");
        fixture.platform.set_data(&button, "b", "pair");
        fixture.platform.set_data(&button, "s", "solo");
        let receiver = fixture.platform.create_child(root, "p");
        fixture.platform.set_data(&receiver, "r", "a|solo");

        attach(&fixture, root);
        fixture.platform.fire(button, EventType::Click);

        let uuid = fixture.platform.data(&receiver, "uuid").unwrap();
        assert_eq!(
            *fixture.log.borrow(),
            vec![
                "_act".to_string(),
                format!("$a:{uuid}:event"),
                format!("$solo:{uuid}:event"),
            ]
        );
    }

    #[test]
    fn data_listeners_overrides_observed_event_types() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "listeners", "keyup");
        let button = fixture.platform.create_child(root, "button");
        fixture.platform.set_data(&button, "c", "act");

        attach(&fixture, root);

        fixture.platform.fire(button, EventType::Click);
        assert!(fixture.log.borrow().is_empty());

        fixture
            .platform
            .fire(button, EventType::Other("keyup".to_string()));
        assert_eq!(*fixture.log.borrow(), vec!["_act".to_string()]);
    }

    #[test]
    fn template_render_rescans_receivers() {
        let fixture =
            fixture_with_template(Some(r#"<p data-r="fromTemplate"></p>"#));
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "send", "fromTemplate");

        let controller = attach(&fixture, root);

        assert_eq!(controller.borrow().receiver_count(), 1);
        let log = fixture.log.borrow();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("$fromTemplate:"));
    }

    #[test]
    fn dispatch_failures_are_logged_not_classified() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "call", "broken|after");

        let controller = attach(&fixture, root);

        // The failing action doesn't block its sibling, and doesn't classify the element.
        assert_eq!(*fixture.log.borrow(), vec!["_after".to_string()]);
        assert_eq!(controller.borrow().error_id(), None);
        assert!(fixture
            .platform
            .classes(root)
            .iter()
            .all(|class| class != COMPONENT_ERROR_CLASS));
        let reports = fixture.platform.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("Tried: _broken"));
    }

    #[test]
    fn unknown_receiver_key_reports_attempted_name() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        fixture.platform.set_data(&root, "send", "ghost");

        attach(&fixture, root);

        // No receiver registered under the key: nothing is invoked and nothing is reported.
        assert!(fixture.log.borrow().is_empty());
        assert!(fixture.platform.reports().is_empty());
    }

    #[test]
    fn classified_element_errors_mark_and_identify_the_element() {
        let fixture = fixture();
        let root = bitty_root(&fixture);
        let culprit = fixture.platform.create_child(root, "input");
        fixture.platform.set_data(&culprit, "r", "a");

        let controller = attach(&fixture, root);
        controller
            .borrow_mut()
            .classify_error(0, Some(&culprit), Some("details".to_string()));

        let classes = fixture.platform.classes(root);
        assert!(classes.contains(&COMPONENT_ERROR_CLASS.to_string()));
        assert!(classes.contains(&ELEMENT_ERROR_CLASS.to_string()));
        let reports = fixture.platform.reports();
        assert!(reports[0].contains("ERROR ELEMENT DETAILS:"));
        assert!(reports[0].contains("ADDITIONAL DETAILS:\n\ndetails"));
    }
}
