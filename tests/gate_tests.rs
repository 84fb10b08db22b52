mod common;

use std::time::Duration;

use common::{by_id, memory_store, nav_link, page, portal, portal_at};
use facility_portal::{
    AccessLevel, AppConfig, Dispatch, GateOutcome, GateState, Key, KeyValueStore, PageKey,
    Portal, UiEvent,
    dialog,
    dom::{Document, EventKind, Selector},
    gate::{self, ORIGINAL_HREF_ATTR},
};

// --- Page Load ---

#[test]
fn test_login_page_is_never_gated() {
    let (mut portal, _) = portal();
    let mut doc = page("/portal/login.html");

    assert_eq!(portal.load_page(&mut doc), GateOutcome::LoginPage);
    assert!(doc.navigations().is_empty());
    assert!(doc.query(Selector::Class(gate::LOGOUT_CLASS)).is_none());
}

#[test]
fn test_no_session_redirects_to_login() {
    let (mut portal, _) = portal();
    let mut doc = page("/portal/index.html");

    assert_eq!(portal.load_page(&mut doc), GateOutcome::RedirectedToLogin);
    assert_eq!(doc.last_navigation(), Some("login.html"));
    assert_eq!(portal.gate().state(), &GateState::Unauthenticated);
}

#[test]
fn test_level_one_on_secrets_gets_denial_notice() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/secrets.html");

    let outcome = portal.load_page(&mut doc);

    assert!(matches!(
        outcome,
        GateOutcome::Denied { page: Some(PageKey::Secrets), .. }
    ));
    let notice = doc.denial_notice().expect("denial notice shown");
    assert_eq!(notice.action_href, "index.html");
    // The page content, navigation included, is gone.
    assert!(doc.query(Selector::Class(gate::NAV_CLASS)).is_none());
    assert!(doc.query(Selector::Class(gate::ACCESS_BADGE_CLASS)).is_none());
    assert!(doc.query(Selector::Class(gate::LOGOUT_CLASS)).is_none());
    assert!(matches!(portal.gate().state(), GateState::Denied(_)));
}

#[test]
fn test_denial_notice_leads_home() {
    let (mut portal, _) = portal_at(2);
    let mut doc = page("/portal/blinks.html");
    portal.load_page(&mut doc);

    let action = doc
        .query(Selector::Class(gate::RETURN_HOME_CLASS))
        .expect("return control rendered");
    assert_eq!(portal.dispatch(&mut doc, UiEvent::Click(action)), Dispatch::Handled);
    assert_eq!(doc.last_navigation(), Some("index.html"));
}

#[test]
fn test_out_of_range_level_allows_no_pages() {
    let sessions = memory_store();
    let mut portal = Portal::new(AppConfig::default(), sessions.clone(), memory_store());

    for payload in [r#"{"name":"Agent X","level":5}"#, r#"{"name":"Agent X","level":0}"#] {
        sessions.set("ibki_user", payload).unwrap();
        let mut doc = page("/portal/index.html");

        let outcome = portal.load_page(&mut doc);

        assert_eq!(
            outcome,
            GateOutcome::Denied { session: None, page: Some(PageKey::Index) },
            "payload {payload}"
        );
        assert!(doc.navigations().is_empty());
        assert!(doc.denial_notice().is_some());
        assert!(doc.query(Selector::Class(gate::NAV_CLASS)).is_none());
        assert_eq!(portal.gate().state(), &GateState::Denied(None));
        assert_eq!(portal.gate().session(), None);
    }
}

#[test]
fn test_granted_page_renders_badge_and_light() {
    let (mut portal, _) = portal_at(3);
    let mut doc = page("/portal/blinks.html");

    let outcome = portal.load_page(&mut doc);

    assert!(matches!(outcome, GateOutcome::Granted { page: PageKey::Blinks, .. }));
    let badge = doc.query(Selector::Class(gate::ACCESS_BADGE_CLASS)).unwrap();
    assert_eq!(doc.text(badge), "ACCESS: LEVEL-3");
    assert_eq!(doc.style(badge, "color").as_deref(), Some("#ffaa00"));
    let light = doc.query(Selector::Class(gate::ACCESS_LIGHT_CLASS)).unwrap();
    assert!(doc.has_class(light, "active"));
}

#[test]
fn test_directory_root_counts_as_index() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/");

    assert!(matches!(
        portal.load_page(&mut doc),
        GateOutcome::Granted { page: PageKey::Index, .. }
    ));
}

// --- Navigation Decoration ---

#[test]
fn test_navigation_marks_pages_above_level() {
    let (mut portal, _) = portal_at(3);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);

    let secrets = nav_link(&doc, "SECRETS");
    assert!(doc.has_class(secrets, gate::RESTRICTED_LINK_CLASS));
    assert_eq!(doc.attribute(secrets, "href").as_deref(), Some("#"));
    assert_eq!(
        doc.attribute(secrets, ORIGINAL_HREF_ATTR).as_deref(),
        Some("./secrets.html")
    );
    let item = doc.parent(secrets).unwrap();
    assert!(doc.has_class(item, gate::RESTRICTED_ITEM_CLASS));

    let blinks = nav_link(&doc, "BLINKS");
    assert!(!doc.has_class(blinks, gate::RESTRICTED_LINK_CLASS));
    assert_eq!(doc.attribute(blinks, "href").as_deref(), Some("./blinks.html"));
}

#[test]
fn test_decoration_is_idempotent() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);
    let snapshot = format!("{doc:?}");

    let level = AccessLevel::ONE;
    assert_eq!(portal.gate().decorate_navigation(&mut doc, level), 3);
    portal.gate().ensure_logout_control(&mut doc);

    assert_eq!(format!("{doc:?}"), snapshot);
    assert_eq!(doc.query_all(Selector::Class(gate::LOCK_ICON_CLASS)).len(), 3);
    assert_eq!(doc.query_all(Selector::Class(gate::LOGOUT_CLASS)).len(), 1);
}

#[test]
fn test_redecoration_at_higher_level_restores_links() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);

    assert_eq!(portal.gate().decorate_navigation(&mut doc, AccessLevel::FOUR), 0);

    let staff = nav_link(&doc, "STAFF");
    assert_eq!(doc.attribute(staff, "href").as_deref(), Some("./staff.html"));
    assert_eq!(doc.attribute(staff, ORIGINAL_HREF_ATTR), None);
    assert!(doc.query_all(Selector::Class(gate::LOCK_ICON_CLASS)).is_empty());
}

// --- Restricted Links & Dialog ---

#[test]
fn test_restricted_click_opens_dialog_and_escape_closes_it() {
    let (mut portal, _) = portal_at(3);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);
    let keydown_before = doc.listener_count(EventKind::KeyDown);

    let secrets = nav_link(&doc, "SECRETS");
    assert_eq!(
        portal.dispatch(&mut doc, UiEvent::Click(secrets)),
        Dispatch::DefaultPrevented
    );

    let modal = by_id(&doc, dialog::MODAL_ID);
    assert!(doc.is_visible(modal));
    assert_eq!(doc.text(by_id(&doc, dialog::CURRENT_LEVEL_ID)), "LEVEL-3");
    assert_eq!(doc.text(by_id(&doc, dialog::REQUIRED_LEVEL_ID)), "LEVEL-4");
    assert_eq!(doc.listener_count(EventKind::KeyDown), keydown_before + 1);
    assert!(doc.navigations().is_empty());

    assert_eq!(
        portal.dispatch(&mut doc, UiEvent::KeyDown(Key::Escape)),
        Dispatch::Handled
    );
    assert!(!doc.is_visible(modal));
    assert_eq!(doc.listener_count(EventKind::KeyDown), keydown_before);
    assert!(!portal.gate().dialog().is_open());
}

#[test]
fn test_click_on_lock_icon_is_intercepted_too() {
    let (mut portal, _) = portal_at(2);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);

    let blinks = nav_link(&doc, "BLINKS");
    let icon = doc
        .query_first_within(blinks, Selector::Class(gate::LOCK_ICON_CLASS))
        .unwrap();

    assert_eq!(
        portal.dispatch(&mut doc, UiEvent::Click(icon)),
        Dispatch::DefaultPrevented
    );
    assert_eq!(doc.text(by_id(&doc, dialog::REQUIRED_LEVEL_ID)), "LEVEL-3");
}

#[test]
fn test_reopening_dialog_keeps_single_escape_listener() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);
    let before = doc.listener_count(EventKind::KeyDown);

    let staff = nav_link(&doc, "STAFF");
    portal.dispatch(&mut doc, UiEvent::Click(staff));
    let secrets = nav_link(&doc, "SECRETS");
    portal.dispatch(&mut doc, UiEvent::Click(secrets));

    assert_eq!(doc.listener_count(EventKind::KeyDown), before + 1);
    assert_eq!(doc.text(by_id(&doc, dialog::REQUIRED_LEVEL_ID)), "LEVEL-4");
}

#[test]
fn test_allowed_link_click_is_left_to_the_browser() {
    let (mut portal, _) = portal_at(4);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);

    let secrets = nav_link(&doc, "SECRETS");
    assert_eq!(portal.dispatch(&mut doc, UiEvent::Click(secrets)), Dispatch::Ignored);
}

#[test]
fn test_reload_of_same_document_closes_open_dialog() {
    let (mut portal, _) = portal_at(3);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);
    let keydown_before = doc.listener_count(EventKind::KeyDown);
    let secrets = nav_link(&doc, "SECRETS");
    portal.dispatch(&mut doc, UiEvent::Click(secrets));
    let bypass = by_id(&doc, dialog::BYPASS_ID);
    portal.dispatch(&mut doc, UiEvent::Click(bypass));

    // Clearance raised while the dialog is up, then the page re-runs.
    portal.sessions().login("Agent Test", AccessLevel::FOUR).unwrap();
    portal.dispatch(&mut doc, UiEvent::PageLoad);

    assert!(!portal.gate().dialog().is_open());
    assert!(!doc.is_visible(by_id(&doc, dialog::MODAL_ID)));
    assert_eq!(doc.listener_count(EventKind::KeyDown), keydown_before);
    assert_eq!(doc.text(bypass), dialog::BYPASS_IDLE_LABEL);
    assert!(!doc.is_disabled(bypass));
    assert!(portal.timers().is_empty());
    assert_eq!(portal.advance_by(&mut doc, Duration::from_secs(5)), 0);
    assert!(!doc.has_class(secrets, gate::RESTRICTED_LINK_CLASS));
}

#[test]
fn test_dialog_reopened_after_reload_still_closes() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);
    let keydown_before = doc.listener_count(EventKind::KeyDown);
    let staff = nav_link(&doc, "STAFF");
    portal.dispatch(&mut doc, UiEvent::Click(staff));

    portal.load_page(&mut doc);
    portal.dispatch(&mut doc, UiEvent::Click(staff));
    assert_eq!(doc.listener_count(EventKind::KeyDown), keydown_before + 1);

    assert_eq!(
        portal.dispatch(&mut doc, UiEvent::KeyDown(Key::Escape)),
        Dispatch::Handled
    );
    assert_eq!(doc.listener_count(EventKind::KeyDown), keydown_before);
    assert!(!doc.is_visible(by_id(&doc, dialog::MODAL_ID)));
}

// --- Logout ---

#[test]
fn test_logout_clears_session_and_next_load_redirects() {
    let (mut portal, _) = portal_at(2);
    let mut doc = page("/portal/staff.html");
    portal.load_page(&mut doc);

    let logout = doc.query(Selector::Class(gate::LOGOUT_CLASS)).unwrap();
    assert_eq!(doc.listeners_on(logout, EventKind::Click), 1);
    assert_eq!(portal.dispatch(&mut doc, UiEvent::Click(logout)), Dispatch::Handled);

    assert_eq!(portal.sessions().current(), None);
    assert_eq!(doc.last_navigation(), Some("login.html"));

    let mut next = page("/portal/index.html");
    assert_eq!(portal.load_page(&mut next), GateOutcome::RedirectedToLogin);
    assert_eq!(next.last_navigation(), Some("login.html"));
}

#[test]
fn test_missing_dialog_markup_is_tolerated() {
    let (mut portal, _) = portal_at(1);
    let mut doc = page("/portal/index.html");
    portal.load_page(&mut doc);
    let modal = by_id(&doc, dialog::MODAL_ID);
    doc.remove_element(modal);

    let secrets = nav_link(&doc, "SECRETS");
    assert_eq!(
        portal.dispatch(&mut doc, UiEvent::Click(secrets)),
        Dispatch::DefaultPrevented
    );
    assert!(!portal.gate().dialog().is_open());
}
