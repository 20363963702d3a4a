use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use super::{DomEvent, EventHandler, EventType, Platform};

/// Handle to one node in a [`MemoryPlatform`] tree (index into the arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryElement(usize);

struct MemoryNode {
    tag: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attrs: BTreeMap<String, String>,
    value: Option<String>,
    html: String,
    listeners: Vec<(EventType, EventHandler<MemoryElement>)>,
}

impl MemoryNode {
    fn new(tag: &str, parent: Option<usize>) -> Self {
        Self {
            tag: tag.to_lowercase(),
            parent,
            children: Vec::new(),
            attrs: BTreeMap::new(),
            value: None,
            html: String::new(),
            listeners: Vec::new(),
        }
    }
}

/// Headless [`Platform`] over an in-memory element arena.
///
/// Identifiers are a deterministic sequence, storage is a plain map, and error reports are
/// recorded instead of printed, so every controller behavior can be asserted natively without a
/// browser. Events are synthesized with [`MemoryPlatform::fire`], which bubbles from the target
/// up through its ancestors like the real DOM dispatch does.
#[derive(Default)]
pub struct MemoryPlatform {
    nodes: RefCell<Vec<MemoryNode>>,
    storage: RefCell<HashMap<String, String>>,
    reports: RefCell<Vec<String>>,
    root_styles: RefCell<BTreeMap<String, String>>,
    next_uuid: Cell<usize>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> MemoryElement {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len();
        nodes.push(MemoryNode::new(tag, None));

        MemoryElement(id)
    }

    /// Create an element appended under `parent`.
    pub fn create_child(&self, parent: MemoryElement, tag: &str) -> MemoryElement {
        let child = self.create_element(tag);
        self.append_child(parent, child);

        child
    }

    pub fn append_child(&self, parent: MemoryElement, child: MemoryElement) {
        let mut nodes = self.nodes.borrow_mut();
        nodes[child.0].parent = Some(parent.0);
        nodes[parent.0].children.push(child.0);
    }

    pub fn attr(&self, el: MemoryElement, name: &str) -> Option<String> {
        self.nodes.borrow()[el.0].attrs.get(name).cloned()
    }

    pub fn set_attr(&self, el: MemoryElement, name: &str, value: &str) {
        self.nodes.borrow_mut()[el.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    /// The element's class attribute, split into individual names.
    pub fn classes(&self, el: MemoryElement) -> Vec<String> {
        self.attr(el, "class")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Every diagnostic recorded through [`Platform::report_error`], oldest first.
    pub fn reports(&self) -> Vec<String> {
        self.reports.borrow().clone()
    }

    pub fn root_style(&self, property: &str) -> Option<String> {
        self.root_styles.borrow().get(property).cloned()
    }

    /// Synthesize an event on `target`. Handlers registered on the target and each of its
    /// ancestors run in bubbling order, each receiving the original target.
    pub fn fire(&self, target: MemoryElement, event_type: EventType) {
        // Collect the handlers first so none of them re-enter a held borrow.
        let handlers: Vec<EventHandler<MemoryElement>> = {
            let nodes = self.nodes.borrow();
            let mut handlers = Vec::new();
            let mut current = Some(target.0);

            while let Some(id) = current {
                for (registered, handler) in &nodes[id].listeners {
                    if *registered == event_type {
                        handlers.push(Rc::clone(handler));
                    }
                }
                current = nodes[id].parent;
            }

            handlers
        };

        for handler in handlers {
            handler(DomEvent {
                event_type: event_type.clone(),
                target,
            });
        }
    }

    /// Preorder walk of every descendant of `root`.
    fn descendants(&self, root: usize) -> Vec<usize> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<usize> = nodes[root].children.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(nodes[id].children.iter().rev().copied());
        }

        out
    }

    /// Parse `markup` into child elements of `parent`. Understands plain tags with quoted
    /// attributes, nesting, self-closing tags and the common void tags; text content is ignored.
    fn parse_into(&self, parent: usize, markup: &str) {
        const VOID_TAGS: [&str; 6] = ["input", "br", "hr", "img", "meta", "link"];

        let mut stack = vec![parent];
        let mut rest = markup;

        while let Some(open) = rest.find('<') {
            rest = &rest[open + 1..];

            if let Some(tail) = rest.strip_prefix('/') {
                let Some(end) = tail.find('>') else { break };
                if stack.len() > 1 {
                    stack.pop();
                }
                rest = &tail[end + 1..];
                continue;
            }

            let Some(end) = rest.find('>') else { break };
            let raw_tag = &rest[..end];
            rest = &rest[end + 1..];

            let self_closing = raw_tag.trim_end().ends_with('/');
            let body = raw_tag.trim_end_matches('/').trim();
            let (name, attrs_raw) = body
                .split_once(char::is_whitespace)
                .unwrap_or((body, ""));
            if name.is_empty() {
                continue;
            }

            let el = self.create_element(name);
            {
                let mut nodes = self.nodes.borrow_mut();
                nodes[el.0].attrs = parse_attrs(attrs_raw);
                nodes[el.0].parent = Some(*stack.last().unwrap_or(&parent));
            }
            {
                let parent_id = *stack.last().unwrap_or(&parent);
                self.nodes.borrow_mut()[parent_id].children.push(el.0);
            }

            if !self_closing && !VOID_TAGS.contains(&name.to_lowercase().as_str()) {
                stack.push(el.0);
            }
        }
    }
}

impl Platform for MemoryPlatform {
    type Element = MemoryElement;

    fn random_uuid(&self) -> String {
        let id = self.next_uuid.get();
        self.next_uuid.set(id + 1);

        format!("uuid-{id:04}")
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<MemoryElement> {
        let nodes = self.nodes.borrow();

        (0..nodes.len())
            .filter(|&id| nodes[id].tag == tag)
            .map(MemoryElement)
            .collect()
    }

    fn marked_descendants(&self, root: &MemoryElement, keys: &[&str]) -> Vec<MemoryElement> {
        let descendants = self.descendants(root.0);
        let nodes = self.nodes.borrow();

        descendants
            .into_iter()
            .filter(|&id| {
                keys.iter()
                    .any(|key| nodes[id].attrs.contains_key(&format!("data-{key}")))
            })
            .map(MemoryElement)
            .collect()
    }

    fn data(&self, el: &MemoryElement, key: &str) -> Option<String> {
        self.attr(*el, &format!("data-{key}"))
    }

    fn set_data(&self, el: &MemoryElement, key: &str, value: &str) {
        self.set_attr(*el, &format!("data-{key}"), value);
    }

    fn tag_name(&self, el: &MemoryElement) -> String {
        self.nodes.borrow()[el.0].tag.clone()
    }

    fn add_class(&self, el: &MemoryElement, class: &str) {
        if self.classes(*el).iter().any(|existing| existing == class) {
            return;
        }

        let updated = match self.attr(*el, "class") {
            Some(existing) => format!("{existing} {class}"),
            None => class.to_string(),
        };
        self.set_attr(*el, "class", &updated);
    }

    fn append_html(&self, el: &MemoryElement, markup: &str) {
        self.nodes.borrow_mut()[el.0].html.push_str(markup);
        self.parse_into(el.0, markup);
    }

    fn inner_html(&self, el: &MemoryElement) -> String {
        self.nodes.borrow()[el.0].html.clone()
    }

    fn set_inner_html(&self, el: &MemoryElement, markup: &str) {
        {
            let mut nodes = self.nodes.borrow_mut();
            nodes[el.0].children.clear();
            nodes[el.0].html = markup.to_string();
        }
        self.parse_into(el.0, markup);
    }

    fn value(&self, el: &MemoryElement) -> Option<String> {
        self.nodes.borrow()[el.0].value.clone()
    }

    fn set_value(&self, el: &MemoryElement, value: &str) {
        self.nodes.borrow_mut()[el.0].value = Some(value.to_string());
    }

    fn set_root_style(&self, property: &str, value: &str) {
        self.root_styles
            .borrow_mut()
            .insert(property.to_string(), value.to_string());
    }

    fn listen(&self, el: &MemoryElement, event_type: &EventType, handler: EventHandler<MemoryElement>) {
        self.nodes.borrow_mut()[el.0]
            .listeners
            .push((event_type.clone(), handler));
    }

    fn storage_get(&self, key: &str) -> Option<String> {
        self.storage.borrow().get(key).cloned()
    }

    fn storage_set(&self, key: &str, value: &str) {
        self.storage
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn report_error(&self, text: &str) {
        self.reports.borrow_mut().push(text.to_string());
    }
}

fn parse_attrs(raw: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let mut rest = raw.trim_start();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let mut value = String::new();
        if let Some(tail) = rest.strip_prefix('=') {
            let tail = tail.trim_start();
            if let Some(quoted) = tail.strip_prefix('"') {
                match quoted.find('"') {
                    Some(close) => {
                        value = quoted[..close].to_string();
                        rest = &quoted[close + 1..];
                    }
                    None => {
                        value = quoted.to_string();
                        rest = "";
                    }
                }
            } else {
                let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
                value = tail[..end].to_string();
                rest = &tail[end..];
            }
        }

        if !name.is_empty() {
            attrs.insert(name.to_string(), value);
        }
        rest = rest.trim_start();
    }

    attrs
}
