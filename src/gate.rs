use crate::{
    Dispatch, Key,
    auth::{SessionStore, StoredSession},
    config::AppConfig,
    dialog::AccessDialog,
    dom::{DenialNotice, Document, ElementRef, EventKind, Selector},
    models::{AccessLevel, PageKey, Session},
    policy::{AccessPolicy, BadgeTier},
    timers::{TimerId, TimerQueue, TimerTask},
};

// --- Markup Contract ---

pub const ACCESS_BADGE_CLASS: &str = "access-badge";
pub const ACCESS_LIGHT_CLASS: &str = "access-light";
pub const NAV_CLASS: &str = "main-nav";
pub const RESTRICTED_ITEM_CLASS: &str = "restricted";
pub const RESTRICTED_LINK_CLASS: &str = "restricted-link";
pub const LOCK_ICON_CLASS: &str = "lock-icon";
pub const LOGOUT_CLASS: &str = "logout-btn";
pub const RETURN_HOME_CLASS: &str = "return-home";
/// Where a restricted link keeps its real destination.
pub const ORIGINAL_HREF_ATTR: &str = "data-original-href";
const PLACEHOLDER_HREF: &str = "#";
const LOCK_ICON: &str = "🔒";
const LOGOUT_LABEL: &str = "LOG OUT";

/// GateState
///
/// What the gate concluded on the last page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Authenticated(Session),
    /// Authenticated, but the page was above the session's clearance. Terminal
    /// for this page: only navigating away recovers. `None` when the stored
    /// level was outside 1..=4.
    Denied(Option<Session>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The login page is never gated.
    LoginPage,
    RedirectedToLogin,
    Denied {
        session: Option<Session>,
        page: Option<PageKey>,
    },
    Granted { session: Session, page: PageKey },
}

/// SessionGate
///
/// Runs on every page load and on every click/key event: reads the session,
/// asks `AccessPolicy` what it may see, and drives the document accordingly.
pub struct SessionGate {
    config: AppConfig,
    sessions: SessionStore,
    dialog: AccessDialog,
    state: GateState,
}

impl SessionGate {
    pub fn new(config: AppConfig, sessions: SessionStore) -> Self {
        let dialog = AccessDialog::new(config.timings);
        Self {
            config,
            sessions,
            dialog,
            state: GateState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            GateState::Authenticated(session) | GateState::Denied(Some(session)) => Some(session),
            GateState::Denied(None) | GateState::Unauthenticated => None,
        }
    }

    pub fn dialog(&self) -> &AccessDialog {
        &self.dialog
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// on_page_load
    ///
    /// The load pipeline, in order:
    /// 1. The login page is left alone.
    /// 2. No session: redirect to login and stop.
    /// 3. Current page above clearance: replace the body with the denial notice and stop.
    /// 4. Otherwise: access badge, navigation decoration, logout control.
    ///
    /// A dialog left open by an earlier run is closed first, so its Escape
    /// listener and bypass timers do not outlive it.
    pub fn on_page_load(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) -> GateOutcome {
        self.dialog.close(doc, timers);
        let path = doc.current_path();
        let segment = last_segment(&path);

        if segment == last_segment(&self.config.login_page) {
            self.state = GateState::Unauthenticated;
            return GateOutcome::LoginPage;
        }

        let page = PageKey::from_href(segment);
        let session = match self.sessions.stored() {
            StoredSession::Valid(session) => session,
            StoredSession::Absent => {
                tracing::info!(path = %path, "no session, redirecting to login");
                self.state = GateState::Unauthenticated;
                doc.navigate(&self.config.login_page);
                return GateOutcome::RedirectedToLogin;
            }
            // No pages are allowed below level 1 or above level 4.
            StoredSession::OutOfRange { name, level } => {
                tracing::warn!(
                    user = %name,
                    level,
                    path = %path,
                    "no pages allowed, replacing content"
                );
                doc.replace_body(&DenialNotice::new(&self.config.home_page));
                self.state = GateState::Denied(None);
                return GateOutcome::Denied { session: None, page };
            }
        };

        if !AccessPolicy::can_access(session.level, segment) {
            tracing::warn!(
                user = %session.name,
                level = %session.level,
                path = %path,
                "page above clearance, replacing content"
            );
            doc.replace_body(&DenialNotice::new(&self.config.home_page));
            self.state = GateState::Denied(Some(session.clone()));
            return GateOutcome::Denied {
                session: Some(session),
                page,
            };
        }

        self.render_badge(doc, session.level);
        self.decorate_navigation(doc, session.level);
        self.ensure_logout_control(doc);

        tracing::info!(
            user = %session.name,
            level = %session.level,
            path = %path,
            "access granted"
        );
        self.state = GateState::Authenticated(session.clone());
        // can_access only succeeds for known pages.
        GateOutcome::Granted {
            session,
            page: page.unwrap_or(PageKey::Index),
        }
    }

    /// render_badge
    ///
    /// Writes `ACCESS: LEVEL-n` into the header badge with its tier colours and
    /// lights the access indicator. Pages without a badge are skipped.
    pub fn render_badge(&self, doc: &mut dyn Document, level: AccessLevel) {
        if let Some(badge) = doc.query(Selector::Class(ACCESS_BADGE_CLASS)) {
            let tier = BadgeTier::for_level(level);
            doc.set_text(badge, &format!("ACCESS: {}", level.label()));
            doc.set_style(badge, "background", tier.background());
            doc.set_style(badge, "color", tier.color());
            doc.set_style(badge, "border-color", tier.color());
        }
        if let Some(light) = doc.query(Selector::Class(ACCESS_LIGHT_CLASS)) {
            doc.add_class(light, "active");
        }
    }

    /// decorate_navigation
    ///
    /// Brings every navigation entry in line with `level`. Entries the level
    /// may not reach get the restricted classes, a placeholder href with the
    /// real one parked in `data-original-href`, and one lock icon. Reachable
    /// entries have all of that undone. Safe to run repeatedly; returns the
    /// number of restricted entries.
    pub fn decorate_navigation(&self, doc: &mut dyn Document, level: AccessLevel) -> usize {
        let Some(nav) = doc.query(Selector::Class(NAV_CLASS)) else {
            return 0;
        };

        let mut restricted = 0;
        for item in doc.query_within(nav, Selector::Tag("li")) {
            let Some(link) = doc.query_first_within(item, Selector::Tag("a")) else {
                continue;
            };
            let Some(destination) = doc
                .attribute(link, ORIGINAL_HREF_ATTR)
                .or_else(|| doc.attribute(link, "href"))
            else {
                continue;
            };

            if AccessPolicy::can_access(level, &destination) {
                unrestrict(doc, item, link, &destination);
            } else {
                restrict(doc, item, link, &destination);
                restricted += 1;
            }
        }

        tracing::debug!(level = %level, restricted, "navigation decorated");
        restricted
    }

    /// Adds the floating logout control unless one is already on the page.
    pub fn ensure_logout_control(&self, doc: &mut dyn Document) -> ElementRef {
        if let Some(existing) = doc.query(Selector::Class(LOGOUT_CLASS)) {
            return existing;
        }
        let body = doc.body();
        let button = doc.create_element(body, "button", LOGOUT_CLASS);
        doc.set_text(button, LOGOUT_LABEL);
        for (property, value) in [
            ("position", "fixed"),
            ("bottom", "20px"),
            ("right", "20px"),
            ("background", "rgba(255, 0, 64, 0.2)"),
            ("color", "#ff6666"),
            ("border", "1px solid #ff6666"),
            ("z-index", "1000"),
        ] {
            doc.set_style(button, property, value);
        }
        doc.add_listener(button, EventKind::Click);
        button
    }

    /// on_click
    ///
    /// Dialog controls first, then restricted links (navigation cancelled,
    /// dialog opened), the logout control and the denial notice's way home.
    pub fn on_click(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut TimerQueue,
        target: ElementRef,
    ) -> Dispatch {
        if self.dialog.on_click(doc, timers, target) {
            return Dispatch::Handled;
        }

        if let Some(link) = doc.closest(target, Selector::Class(RESTRICTED_LINK_CLASS)) {
            if doc.matches(link, Selector::Tag("a")) {
                let destination = doc
                    .attribute(link, ORIGINAL_HREF_ATTR)
                    .unwrap_or_else(|| PLACEHOLDER_HREF.to_string());
                let required = AccessPolicy::required_level_for_href(&destination);
                let current = self.session().map(|s| s.level);
                tracing::info!(
                    destination = %destination,
                    required = %required,
                    "restricted link intercepted"
                );
                self.dialog.open(doc, current, required);
                return Dispatch::DefaultPrevented;
            }
        }

        if doc.closest(target, Selector::Class(LOGOUT_CLASS)).is_some() {
            self.logout(doc, timers);
            return Dispatch::Handled;
        }

        if let Some(action) = doc.closest(target, Selector::Class(RETURN_HOME_CLASS)) {
            let href = doc
                .attribute(action, "data-href")
                .unwrap_or_else(|| self.config.home_page.clone());
            doc.navigate(&href);
            return Dispatch::Handled;
        }

        Dispatch::Ignored
    }

    pub fn on_key(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue, key: &Key) -> bool {
        self.dialog.on_key(doc, timers, key)
    }

    pub fn on_timer(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut TimerQueue,
        id: TimerId,
        task: TimerTask,
    ) -> bool {
        self.dialog.on_timer(doc, timers, id, task)
    }

    /// Clears the session and goes to the login page, whatever the storage says.
    pub fn logout(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        self.dialog.close(doc, timers);
        if let Err(e) = self.sessions.logout() {
            tracing::error!("logout error: {:?}", e);
        }
        self.state = GateState::Unauthenticated;
        doc.navigate(&self.config.login_page);
    }
}

fn restrict(doc: &mut dyn Document, item: ElementRef, link: ElementRef, destination: &str) {
    doc.add_class(item, RESTRICTED_ITEM_CLASS);
    doc.add_class(link, RESTRICTED_LINK_CLASS);
    doc.set_attribute(link, ORIGINAL_HREF_ATTR, destination);
    doc.set_attribute(link, "href", PLACEHOLDER_HREF);

    if doc.query_first_within(link, Selector::Class(LOCK_ICON_CLASS)).is_none() {
        let icon = doc.create_element(link, "span", LOCK_ICON_CLASS);
        doc.set_text(icon, LOCK_ICON);
    }
}

fn unrestrict(doc: &mut dyn Document, item: ElementRef, link: ElementRef, destination: &str) {
    doc.remove_class(item, RESTRICTED_ITEM_CLASS);
    doc.remove_class(link, RESTRICTED_LINK_CLASS);

    if doc.attribute(link, ORIGINAL_HREF_ATTR).is_some() {
        doc.set_attribute(link, "href", destination);
        doc.remove_attribute(link, ORIGINAL_HREF_ATTR);
    }

    for icon in doc.query_within(link, Selector::Class(LOCK_ICON_CLASS)) {
        doc.remove_element(icon);
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}
