#![allow(dead_code)]

use std::sync::Arc;

use facility_portal::{
    AccessLevel, AppConfig, ElementRef, MemoryStore, Portal, StoreState, VirtualDocument,
    dialog, dom::Document, handlers,
};

// --- Page Fixtures ---

/// A portal page as the static site ships it: header badge and light, the
/// five-entry navigation and the access dialog markup.
pub fn page(path: &str) -> VirtualDocument {
    let mut doc = VirtualDocument::new(path);
    let body = doc.body();

    let header = doc.create_element(body, "header", "site-header");
    doc.create_element(header, "span", "access-badge");
    doc.create_element(header, "span", "access-light");

    let nav = doc.create_element(body, "nav", "main-nav");
    let list = doc.create_element(nav, "ul", "");
    for (href, label) in [
        ("./index.html", "MAIN"),
        ("./building.html", "BUILDING"),
        ("./staff.html", "STAFF"),
        ("./blinks.html", "BLINKS"),
        ("./secrets.html", "SECRETS"),
    ] {
        let item = doc.create_element(list, "li", "");
        let link = doc.create_element(item, "a", "");
        doc.set_attribute(link, "href", href);
        doc.set_text(link, label);
    }

    let modal = doc.append_with_id(body, "div", dialog::MODAL_ID, "modal");
    doc.set_visible(modal, false);
    let content = doc.create_element(modal, "div", "modal-content");
    doc.create_element(content, "span", dialog::CLOSE_CLASS);
    doc.append_with_id(content, "span", dialog::CURRENT_LEVEL_ID, "");
    doc.append_with_id(content, "span", dialog::REQUIRED_LEVEL_ID, "");
    doc.append_with_id(content, "button", dialog::ACKNOWLEDGE_ID, "");
    let bypass = doc.append_with_id(content, "button", dialog::BYPASS_ID, "");
    doc.set_text(bypass, dialog::BYPASS_IDLE_LABEL);

    doc
}

/// `page("/portal/staff.html")` plus the roster markup.
pub fn staff_page() -> VirtualDocument {
    let mut doc = page("/portal/staff.html");
    let body = doc.body();

    let panel = doc.append_with_id(body, "div", handlers::MANAGEMENT_PANEL_ID, "management-panel");
    doc.set_visible(panel, false);
    doc.append_with_id(panel, "button", handlers::ADD_BUTTON_ID, "");
    let delete_mode = doc.append_with_id(panel, "button", handlers::DELETE_MODE_BUTTON_ID, "");
    doc.set_text(delete_mode, handlers::DELETE_MODE_LABEL);
    doc.append_with_id(panel, "button", handlers::SAVE_ALL_BUTTON_ID, "");

    let stats = doc.create_element(body, "div", "staff-stats");
    for id in [
        handlers::TOTAL_COUNT_ID,
        handlers::PRESENT_COUNT_ID,
        handlers::ABSENT_COUNT_ID,
    ] {
        doc.append_with_id(stats, "span", id, "stat-value");
    }
    doc.append_with_id(body, "div", handlers::CONTAINER_ID, "staff-grid");

    let modal = doc.append_with_id(body, "div", handlers::FORM_MODAL_ID, "modal");
    doc.set_visible(modal, false);
    let form = doc.create_element(modal, "div", "modal-content");
    doc.append_with_id(form, "span", handlers::FORM_CLOSE_ID, "");
    doc.append_with_id(form, "h2", handlers::FORM_TITLE_ID, "");
    let errors = doc.append_with_id(form, "div", handlers::FORM_ERRORS_ID, "form-errors");
    doc.set_visible(errors, false);
    for field in [
        handlers::FIELD_ID,
        handlers::FIELD_NAME,
        handlers::FIELD_POSITION,
        handlers::FIELD_LEVEL,
        handlers::FIELD_STATUS,
        handlers::FIELD_BIOMETRICS,
        handlers::FIELD_WORK_DURATION,
        handlers::FIELD_ACHIEVEMENTS,
        handlers::FIELD_NOTE,
        handlers::FIELD_PHOTO,
    ] {
        doc.append_with_id(form, "input", field, "");
    }
    doc.append_with_id(form, "button", handlers::FORM_CANCEL_ID, "");
    doc.append_with_id(form, "button", handlers::FORM_SAVE_ID, "");
    doc.append_with_id(form, "button", handlers::FORM_DELETE_ID, "");

    doc
}

// --- Portal Fixtures ---

pub fn memory_store() -> StoreState {
    Arc::new(MemoryStore::new())
}

/// A portal over fresh in-memory stores. Returns the roster store as well so
/// tests can reopen the roster behind the portal's back.
pub fn portal() -> (Portal, StoreState) {
    let roster = memory_store();
    let portal = Portal::new(AppConfig::default(), memory_store(), roster.clone());
    (portal, roster)
}

/// A portal with a session at `level` already written.
pub fn portal_at(level: u8) -> (Portal, StoreState) {
    let (portal, roster) = portal();
    let level = AccessLevel::new(level).expect("fixture level is within 1..=4");
    portal
        .sessions()
        .login("Agent Test", level)
        .expect("memory store accepts the session");
    (portal, roster)
}

pub fn by_id(doc: &VirtualDocument, id: &str) -> ElementRef {
    doc.element_by_id(id)
        .unwrap_or_else(|| panic!("fixture has no element #{id}"))
}

pub fn nav_link(doc: &VirtualDocument, label: &str) -> ElementRef {
    doc.query_all(facility_portal::dom::Selector::Tag("a"))
        .into_iter()
        .find(|link| doc.text(*link) == label)
        .unwrap_or_else(|| panic!("fixture has no link {label}"))
}
