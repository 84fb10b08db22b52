//! The rendering collaborator.
//!
//! The portal never touches a real page. It reads and mutates one through the
//! [`Document`] trait: a small, DOM-shaped command surface (text, classes,
//! attributes, styles, visibility, element creation, listener bookkeeping,
//! navigation). Browser hosts implement it over their DOM; [`VirtualDocument`]
//! is the in-memory implementation used by tests and headless hosts.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle to one element of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementRef(pub usize);

/// Handle to a registered listener, used to detach it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    /// Matches the `id` attribute.
    Id(&'a str),
    Class(&'a str),
    Tag(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    DoubleClick,
    KeyDown,
    Change,
}

/// DenialNotice
///
/// Full-page content shown when the current page is above the visitor's
/// clearance. Its only action leads back to the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialNotice {
    pub title: String,
    pub message: String,
    pub action_label: String,
    pub action_href: String,
}

impl DenialNotice {
    pub fn new(home_page: &str) -> Self {
        Self {
            title: "⛔ ACCESS DENIED".to_string(),
            message: "Your access level is insufficient to view this page.".to_string(),
            action_label: "RETURN TO MAIN PAGE".to_string(),
            action_href: home_page.to_string(),
        }
    }
}

/// Document
///
/// Commands and queries against the rendered page. Operations on an element
/// that is no longer attached are no-ops, mirroring how a detached DOM node
/// silently absorbs writes.
pub trait Document {
    /// Path of the page currently shown, e.g. `/portal/staff.html`.
    fn current_path(&self) -> String;

    fn navigate(&mut self, href: &str);

    fn body(&self) -> ElementRef;

    /// All attached matches, in document order.
    fn query_all(&self, selector: Selector<'_>) -> Vec<ElementRef>;

    /// Attached descendants of `root` (excluding `root`) that match, in document order.
    fn query_within(&self, root: ElementRef, selector: Selector<'_>) -> Vec<ElementRef>;

    fn matches(&self, el: ElementRef, selector: Selector<'_>) -> bool;

    fn parent(&self, el: ElementRef) -> Option<ElementRef>;

    /// Whether `el` is still part of the page.
    fn is_attached(&self, el: ElementRef) -> bool;

    fn attribute(&self, el: ElementRef, name: &str) -> Option<String>;
    fn set_attribute(&mut self, el: ElementRef, name: &str, value: &str);
    fn remove_attribute(&mut self, el: ElementRef, name: &str);

    fn has_class(&self, el: ElementRef, class: &str) -> bool;
    fn add_class(&mut self, el: ElementRef, class: &str);
    fn remove_class(&mut self, el: ElementRef, class: &str);

    fn text(&self, el: ElementRef) -> String;
    fn set_text(&mut self, el: ElementRef, text: &str);

    /// An empty `value` clears the property.
    fn set_style(&mut self, el: ElementRef, property: &str, value: &str);
    fn style(&self, el: ElementRef, property: &str) -> Option<String>;

    fn set_visible(&mut self, el: ElementRef, visible: bool);
    fn is_visible(&self, el: ElementRef) -> bool;

    fn set_disabled(&mut self, el: ElementRef, disabled: bool);
    fn is_disabled(&self, el: ElementRef) -> bool;

    /// Current value of a form control.
    fn value(&self, el: ElementRef) -> String;
    fn set_value(&mut self, el: ElementRef, value: &str);

    fn is_checked(&self, el: ElementRef) -> bool;
    fn set_checked(&mut self, el: ElementRef, checked: bool);

    /// Appends a new element to `parent`. `class` may hold several
    /// space-separated classes.
    fn create_element(&mut self, parent: ElementRef, tag: &str, class: &str) -> ElementRef;
    fn remove_element(&mut self, el: ElementRef);
    fn clear_children(&mut self, el: ElementRef);

    /// Throws away the whole page content and shows `notice` instead.
    fn replace_body(&mut self, notice: &DenialNotice);

    fn add_listener(&mut self, target: ElementRef, kind: EventKind) -> ListenerId;
    fn remove_listener(&mut self, id: ListenerId);

    /// Blocking yes/no question to the visitor.
    fn confirm(&mut self, message: &str) -> bool;

    fn query(&self, selector: Selector<'_>) -> Option<ElementRef> {
        self.query_all(selector).into_iter().next()
    }

    fn query_first_within(&self, root: ElementRef, selector: Selector<'_>) -> Option<ElementRef> {
        self.query_within(root, selector).into_iter().next()
    }

    /// `el` itself or its nearest ancestor matching `selector`.
    fn closest(&self, el: ElementRef, selector: Selector<'_>) -> Option<ElementRef> {
        let mut current = Some(el);
        while let Some(candidate) = current {
            if self.matches(candidate, selector) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }
}

// --- In-Memory Implementation ---

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    value: String,
    checked: bool,
    visible: bool,
    disabled: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
}

impl Node {
    fn new(tag: &str, class: &str, parent: Option<usize>, attached: bool) -> Self {
        Self {
            tag: tag.to_string(),
            classes: class.split_whitespace().map(str::to_string).collect(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            checked: false,
            visible: true,
            disabled: false,
            parent,
            children: Vec::new(),
            attached,
        }
    }

    fn matches(&self, selector: Selector<'_>) -> bool {
        match selector {
            Selector::Id(id) => self.attributes.get("id").is_some_and(|v| v == id),
            Selector::Class(class) => self.classes.iter().any(|c| c == class),
            Selector::Tag(tag) => self.tag.eq_ignore_ascii_case(tag),
        }
    }
}

// Shared by every document, so an id kept past a page swap never names a
// listener of the new page.
static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// VirtualDocument
///
/// A page held entirely in memory. Besides the `Document` surface it records
/// navigations, confirmation prompts and the denial notice, and lets the
/// caller script the answer to `confirm`.
#[derive(Debug, Clone)]
pub struct VirtualDocument {
    nodes: Vec<Node>,
    path: String,
    navigations: Vec<String>,
    listeners: BTreeMap<ListenerId, (ElementRef, EventKind)>,
    confirm_answer: bool,
    prompts: Vec<String>,
    denial: Option<DenialNotice>,
}

impl VirtualDocument {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new("body", "", None, true)],
            path: path.into(),
            navigations: Vec::new(),
            listeners: BTreeMap::new(),
            confirm_answer: true,
            prompts: Vec::new(),
            denial: None,
        }
    }

    /// Appends `<tag id="id" class="class">` to `parent`.
    pub fn append_with_id(
        &mut self,
        parent: ElementRef,
        tag: &str,
        id: &str,
        class: &str,
    ) -> ElementRef {
        let el = self.create_element(parent, tag, class);
        self.set_attribute(el, "id", id);
        el
    }

    pub fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        self.query(Selector::Id(id))
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    pub fn last_navigation(&self) -> Option<&str> {
        self.navigations.last().map(String::as_str)
    }

    /// Answer every later `confirm` with `answer`.
    pub fn set_confirm_answer(&mut self, answer: bool) {
        self.confirm_answer = answer;
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn denial_notice(&self) -> Option<&DenialNotice> {
        self.denial.as_ref()
    }

    /// Listeners of `kind` registered on attached elements.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.values().filter(|(_, k)| *k == kind).count()
    }

    pub fn listeners_on(&self, target: ElementRef, kind: EventKind) -> usize {
        self.listeners
            .values()
            .filter(|(t, k)| *t == target && *k == kind)
            .count()
    }

    fn node(&self, el: ElementRef) -> Option<&Node> {
        self.nodes.get(el.0).filter(|n| n.attached)
    }

    fn node_mut(&mut self, el: ElementRef) -> Option<&mut Node> {
        self.nodes.get_mut(el.0).filter(|n| n.attached)
    }

    fn collect_matches(
        &self,
        index: usize,
        selector: Selector<'_>,
        include_self: bool,
        out: &mut Vec<ElementRef>,
    ) {
        let Some(node) = self.nodes.get(index).filter(|n| n.attached) else {
            return;
        };
        if include_self && node.matches(selector) {
            out.push(ElementRef(index));
        }
        for &child in &node.children {
            self.collect_matches(child, selector, true, out);
        }
    }

    fn detach_subtree(&mut self, index: usize) {
        let children = match self.nodes.get_mut(index) {
            Some(node) => {
                node.attached = false;
                node.children.clone()
            }
            None => return,
        };
        for child in children {
            self.detach_subtree(child);
        }
    }
}

impl Document for VirtualDocument {
    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn navigate(&mut self, href: &str) {
        self.navigations.push(href.to_string());
    }

    fn body(&self) -> ElementRef {
        ElementRef(0)
    }

    fn query_all(&self, selector: Selector<'_>) -> Vec<ElementRef> {
        let mut out = Vec::new();
        self.collect_matches(0, selector, true, &mut out);
        out
    }

    fn query_within(&self, root: ElementRef, selector: Selector<'_>) -> Vec<ElementRef> {
        let mut out = Vec::new();
        self.collect_matches(root.0, selector, false, &mut out);
        out
    }

    fn matches(&self, el: ElementRef, selector: Selector<'_>) -> bool {
        self.node(el).is_some_and(|n| n.matches(selector))
    }

    fn parent(&self, el: ElementRef) -> Option<ElementRef> {
        self.node(el).and_then(|n| n.parent).map(ElementRef)
    }

    fn is_attached(&self, el: ElementRef) -> bool {
        self.node(el).is_some()
    }

    fn attribute(&self, el: ElementRef, name: &str) -> Option<String> {
        self.node(el).and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, el: ElementRef, name: &str, value: &str) {
        if let Some(node) = self.node_mut(el) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, el: ElementRef, name: &str) {
        if let Some(node) = self.node_mut(el) {
            node.attributes.remove(name);
        }
    }

    fn has_class(&self, el: ElementRef, class: &str) -> bool {
        self.matches(el, Selector::Class(class))
    }

    fn add_class(&mut self, el: ElementRef, class: &str) {
        if let Some(node) = self.node_mut(el) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, el: ElementRef, class: &str) {
        if let Some(node) = self.node_mut(el) {
            node.classes.retain(|c| c != class);
        }
    }

    fn text(&self, el: ElementRef) -> String {
        self.node(el).map(|n| n.text.clone()).unwrap_or_default()
    }

    fn set_text(&mut self, el: ElementRef, text: &str) {
        if let Some(node) = self.node_mut(el) {
            node.text = text.to_string();
        }
    }

    fn set_style(&mut self, el: ElementRef, property: &str, value: &str) {
        if let Some(node) = self.node_mut(el) {
            if value.is_empty() {
                node.style.remove(property);
            } else {
                node.style.insert(property.to_string(), value.to_string());
            }
        }
    }

    fn style(&self, el: ElementRef, property: &str) -> Option<String> {
        self.node(el).and_then(|n| n.style.get(property).cloned())
    }

    fn set_visible(&mut self, el: ElementRef, visible: bool) {
        if let Some(node) = self.node_mut(el) {
            node.visible = visible;
        }
    }

    fn is_visible(&self, el: ElementRef) -> bool {
        self.node(el).is_some_and(|n| n.visible)
    }

    fn set_disabled(&mut self, el: ElementRef, disabled: bool) {
        if let Some(node) = self.node_mut(el) {
            node.disabled = disabled;
        }
    }

    fn is_disabled(&self, el: ElementRef) -> bool {
        self.node(el).is_some_and(|n| n.disabled)
    }

    fn value(&self, el: ElementRef) -> String {
        self.node(el).map(|n| n.value.clone()).unwrap_or_default()
    }

    fn set_value(&mut self, el: ElementRef, value: &str) {
        if let Some(node) = self.node_mut(el) {
            node.value = value.to_string();
        }
    }

    fn is_checked(&self, el: ElementRef) -> bool {
        self.node(el).is_some_and(|n| n.checked)
    }

    fn set_checked(&mut self, el: ElementRef, checked: bool) {
        if let Some(node) = self.node_mut(el) {
            node.checked = checked;
        }
    }

    fn create_element(&mut self, parent: ElementRef, tag: &str, class: &str) -> ElementRef {
        let index = self.nodes.len();
        let attached = self.is_attached(parent);
        self.nodes.push(Node::new(tag, class, Some(parent.0), attached));
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(index);
        }
        ElementRef(index)
    }

    fn remove_element(&mut self, el: ElementRef) {
        if el == self.body() || !self.is_attached(el) {
            return;
        }
        if let Some(parent) = self.nodes[el.0].parent {
            self.nodes[parent].children.retain(|&c| c != el.0);
        }
        self.detach_subtree(el.0);

        let nodes = &self.nodes;
        self.listeners
            .retain(|_, (target, _)| nodes.get(target.0).is_some_and(|n| n.attached));
    }

    fn clear_children(&mut self, el: ElementRef) {
        let children = match self.node(el) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_element(ElementRef(child));
        }
    }

    fn replace_body(&mut self, notice: &DenialNotice) {
        let body = self.body();
        self.clear_children(body);

        let panel = self.create_element(body, "div", "access-denied");
        let title = self.create_element(panel, "h1", "");
        self.set_text(title, &notice.title);
        let message = self.create_element(panel, "p", "");
        self.set_text(message, &notice.message);
        let action = self.create_element(panel, "button", "return-home");
        self.set_text(action, &notice.action_label);
        self.set_attribute(action, "data-href", &notice.action_href);

        self.denial = Some(notice.clone());
    }

    fn add_listener(&mut self, target: ElementRef, kind: EventKind) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, (target, kind));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.prompts.push(message.to_string());
        self.confirm_answer
    }
}
