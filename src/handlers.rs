use chrono::{DateTime, Utc};

use crate::{
    Dispatch, Key,
    config::Timings,
    dom::{Document, ElementRef, EventKind, ListenerId, Selector},
    error::{PortalError, ValidationErrors},
    models::{Session, StaffDraft, StaffId, StaffRecord},
    policy::{AccessPolicy, BadgeTier},
    repository::RosterRepository,
    timers::{TimerId, TimerQueue, TimerTask},
};

// --- Markup Contract ---

pub const MANAGEMENT_PANEL_ID: &str = "managementPanel";
pub const ADD_BUTTON_ID: &str = "addStaffBtn";
pub const DELETE_MODE_BUTTON_ID: &str = "deleteModeBtn";
pub const SAVE_ALL_BUTTON_ID: &str = "saveAllBtn";
pub const FORM_MODAL_ID: &str = "staffModal";
pub const FORM_CLOSE_ID: &str = "closeStaffModal";
pub const FORM_CANCEL_ID: &str = "cancelStaffBtn";
pub const FORM_SAVE_ID: &str = "saveStaffBtn";
pub const FORM_DELETE_ID: &str = "deleteStaffBtn";
pub const FORM_TITLE_ID: &str = "modalTitle";
pub const FORM_ERRORS_ID: &str = "formErrors";
pub const CONTAINER_ID: &str = "staffContainer";
pub const TOTAL_COUNT_ID: &str = "totalStaffCount";
pub const PRESENT_COUNT_ID: &str = "presentStaffCount";
pub const ABSENT_COUNT_ID: &str = "absentStaffCount";

pub const FIELD_ID: &str = "staffId";
pub const FIELD_NAME: &str = "staffName";
pub const FIELD_POSITION: &str = "position";
pub const FIELD_LEVEL: &str = "accessLevel";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_BIOMETRICS: &str = "biometricData";
pub const FIELD_WORK_DURATION: &str = "workDuration";
pub const FIELD_ACHIEVEMENTS: &str = "achievements";
pub const FIELD_NOTE: &str = "personalNote";
pub const FIELD_PHOTO: &str = "photoUrl";

pub const CARD_CLASS: &str = "staff-card";
pub const EDIT_BUTTON_CLASS: &str = "edit-btn";
pub const DELETE_CHECKBOX_CLASS: &str = "delete-checkbox";
pub const DELETE_MODE_CLASS: &str = "delete-mode";
pub const SELECTED_CLASS: &str = "selected";
pub const NOTIFICATION_CLASS: &str = "staff-notification";
/// Carried by every card.
pub const CARD_ID_ATTR: &str = "data-staff-id";
/// Carried by every edit button.
pub const EDIT_ID_ATTR: &str = "data-id";

pub const ADD_TITLE: &str = "NEW STAFF MEMBER";
pub const EDIT_TITLE: &str = "EDIT STAFF MEMBER";
pub const DELETE_MODE_LABEL: &str = "DELETE MODE";
pub const EXIT_DELETE_MODE_LABEL: &str = "EXIT DELETE MODE";
const EXIT_DELETE_MODE_BACKGROUND: &str = "linear-gradient(to right, #00cc66, #009944)";
const SAVE_FAILED_MESSAGE: &str = "Roster could not be saved";

const FORM_FIELDS: [&str; 10] = [
    FIELD_ID,
    FIELD_NAME,
    FIELD_POSITION,
    FIELD_LEVEL,
    FIELD_STATUS,
    FIELD_BIOMETRICS,
    FIELD_WORK_DURATION,
    FIELD_ACHIEVEMENTS,
    FIELD_NOTE,
    FIELD_PHOTO,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Danger,
}

impl NotificationKind {
    pub fn css_class(self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Danger => "danger",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            NotificationKind::Success => "✅",
            NotificationKind::Danger => "⚠️",
        }
    }
}

/// Which record, if any, the staff form is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Closed,
    Adding,
    Editing(StaffId),
}

/// StaffPanel
///
/// Controller of the staff page: renders the roster cards and head counts for
/// everyone allowed on the page, and the add/edit/delete surface for those who
/// may manage the roster. All writes go through `RosterRepository`.
pub struct StaffPanel {
    repo: RosterRepository,
    timings: Timings,
    can_manage: bool,
    delete_mode: bool,
    form: FormMode,
    // Both live until `unmount`.
    escape_listener: Option<ListenerId>,
    control_listeners: Vec<ListenerId>,
    notification: Option<(ElementRef, TimerId)>,
}

impl StaffPanel {
    /// mount
    ///
    /// Renders the roster for `session`. The management panel is shown and
    /// wired only when the session may manage the roster; otherwise it is
    /// hidden and the cards are read-only.
    pub fn mount(
        doc: &mut dyn Document,
        repo: RosterRepository,
        session: &Session,
        timings: Timings,
    ) -> Self {
        let can_manage = AccessPolicy::can_manage_roster(session.level);
        let mut panel = Self {
            repo,
            timings,
            can_manage,
            delete_mode: false,
            form: FormMode::Closed,
            escape_listener: None,
            control_listeners: Vec::new(),
            notification: None,
        };

        match doc.query(Selector::Id(MANAGEMENT_PANEL_ID)) {
            Some(management) => doc.set_visible(management, can_manage),
            None if can_manage => tracing::warn!("management panel not found on staff page"),
            None => {}
        }

        if can_manage {
            for id in [
                ADD_BUTTON_ID,
                DELETE_MODE_BUTTON_ID,
                SAVE_ALL_BUTTON_ID,
                FORM_CLOSE_ID,
                FORM_CANCEL_ID,
                FORM_SAVE_ID,
                FORM_DELETE_ID,
                FORM_MODAL_ID,
            ] {
                if let Some(control) = doc.query(Selector::Id(id)) {
                    let listener = doc.add_listener(control, EventKind::Click);
                    panel.control_listeners.push(listener);
                }
            }
            let body = doc.body();
            panel.escape_listener = Some(doc.add_listener(body, EventKind::KeyDown));
        }

        panel.render(doc);
        tracing::info!(
            user = %session.name,
            can_manage,
            staff = panel.repo.records().len(),
            "staff page mounted"
        );
        panel
    }

    /// unmount
    ///
    /// Takes the panel off the page before another load: every listener it
    /// attached is detached, the form is closed, delete mode is left without
    /// deleting anything, and the notification goes with its timer.
    pub fn unmount(mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        let listeners = self.control_listeners.drain(..).chain(self.escape_listener.take());
        for listener in listeners {
            doc.remove_listener(listener);
        }
        if self.form != FormMode::Closed {
            self.close_form(doc);
        }
        if self.delete_mode {
            self.delete_mode = false;
            clear_delete_mode_view(doc);
        }
        if let Some((_, pending)) = self.notification.take() {
            timers.cancel(pending);
        }
        for toast in doc.query_all(Selector::Class(NOTIFICATION_CLASS)) {
            doc.remove_element(toast);
        }
        tracing::debug!("staff page unmounted");
    }

    pub fn repository(&self) -> &RosterRepository {
        &self.repo
    }

    pub fn can_manage(&self) -> bool {
        self.can_manage
    }

    pub fn is_delete_mode(&self) -> bool {
        self.delete_mode
    }

    pub fn form_mode(&self) -> &FormMode {
        &self.form
    }

    pub fn has_escape_listener(&self) -> bool {
        self.escape_listener.is_some()
    }

    // --- Event Routing ---

    /// on_click
    ///
    /// Routes a click on the staff page. Viewers have no controls, so every
    /// click is ignored for them.
    pub fn on_click(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut TimerQueue,
        target: ElementRef,
        now: DateTime<Utc>,
    ) -> Dispatch {
        if !self.can_manage {
            return Dispatch::Ignored;
        }

        // The modal element itself is the overlay.
        if doc.matches(target, Selector::Id(FORM_MODAL_ID)) {
            self.close_form(doc);
            return Dispatch::Handled;
        }

        if hit(doc, target, ADD_BUTTON_ID) {
            self.open_form(doc, None);
        } else if hit(doc, target, DELETE_MODE_BUTTON_ID) {
            self.toggle_delete_mode(doc, timers);
        } else if hit(doc, target, SAVE_ALL_BUTTON_ID) {
            self.save_all(doc, timers);
        } else if hit(doc, target, FORM_CLOSE_ID) || hit(doc, target, FORM_CANCEL_ID) {
            self.close_form(doc);
        } else if hit(doc, target, FORM_SAVE_ID) {
            self.save(doc, timers, now);
        } else if hit(doc, target, FORM_DELETE_ID) {
            self.delete_current(doc, timers);
        } else if let Some(button) = doc.closest(target, Selector::Class(EDIT_BUTTON_CLASS)) {
            let Some(id) = self.record_id(doc.attribute(button, EDIT_ID_ATTR)) else {
                return Dispatch::Ignored;
            };
            self.open_form(doc, Some(id));
        } else {
            return Dispatch::Ignored;
        }
        Dispatch::Handled
    }

    /// Double-clicking a card opens it in the form, for managers only.
    pub fn on_double_click(&mut self, doc: &mut dyn Document, target: ElementRef) -> Dispatch {
        if !self.can_manage || self.delete_mode {
            return Dispatch::Ignored;
        }
        let Some(card) = doc.closest(target, Selector::Class(CARD_CLASS)) else {
            return Dispatch::Ignored;
        };
        let Some(id) = self.record_id(doc.attribute(card, CARD_ID_ATTR)) else {
            return Dispatch::Ignored;
        };
        self.open_form(doc, Some(id));
        Dispatch::Handled
    }

    /// A delete checkbox mirrors its state onto the card's `selected` class.
    pub fn on_change(&mut self, doc: &mut dyn Document, target: ElementRef) -> Dispatch {
        if !doc.matches(target, Selector::Class(DELETE_CHECKBOX_CLASS)) {
            return Dispatch::Ignored;
        }
        if let Some(card) = doc.closest(target, Selector::Class(CARD_CLASS)) {
            if doc.is_checked(target) {
                doc.add_class(card, SELECTED_CLASS);
            } else {
                doc.remove_class(card, SELECTED_CLASS);
            }
        }
        Dispatch::Handled
    }

    pub fn on_key(&mut self, doc: &mut dyn Document, key: &Key) -> bool {
        if *key == Key::Escape && self.form != FormMode::Closed {
            self.close_form(doc);
            return true;
        }
        false
    }

    /// Removes the notification a dismissal timer was scheduled for, unless a
    /// newer one has already replaced it.
    pub fn on_timer(&mut self, doc: &mut dyn Document, id: TimerId, task: TimerTask) -> bool {
        let TimerTask::DismissNotification(el) = task else {
            return false;
        };
        if self.notification == Some((el, id)) {
            self.notification = None;
        }
        if doc.is_attached(el) {
            doc.remove_element(el);
        }
        true
    }

    // --- Form ---

    /// open_form
    ///
    /// `None` opens an empty add form with a generated id; `Some(id)` loads
    /// that record for editing and reveals the delete control.
    pub fn open_form(&mut self, doc: &mut dyn Document, editing: Option<StaffId>) {
        let Some(modal) = doc.query(Selector::Id(FORM_MODAL_ID)) else {
            tracing::warn!("staff form not found on staff page");
            return;
        };

        let draft = match &editing {
            Some(id) => match self.repo.get(id) {
                Some(record) => StaffDraft::from_record(record),
                None => {
                    tracing::warn!(id = %id, "edit requested for unknown staff member");
                    return;
                }
            },
            None => StaffDraft::blank(StaffId::generate()),
        };

        if let Some(title) = doc.query(Selector::Id(FORM_TITLE_ID)) {
            let text = if editing.is_some() { EDIT_TITLE } else { ADD_TITLE };
            doc.set_text(title, text);
        }
        if let Some(delete) = doc.query(Selector::Id(FORM_DELETE_ID)) {
            doc.set_visible(delete, editing.is_some());
        }
        write_draft(doc, &draft);
        hide_errors(doc);
        doc.set_visible(modal, true);

        self.form = match editing {
            Some(id) => FormMode::Editing(id),
            None => FormMode::Adding,
        };
    }

    pub fn close_form(&mut self, doc: &mut dyn Document) {
        if let Some(modal) = doc.query(Selector::Id(FORM_MODAL_ID)) {
            doc.set_visible(modal, false);
        }
        hide_errors(doc);
        self.form = FormMode::Closed;
    }

    /// save
    ///
    /// Validates the form and adds or updates the record. Violations are
    /// listed in the form's error area and the form stays open; a storage
    /// failure becomes a danger notification.
    pub fn save(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue, now: DateTime<Utc>) {
        let draft = read_draft(doc);
        let result = match &self.form {
            FormMode::Closed => return,
            FormMode::Adding => self.repo.add(&draft, now),
            FormMode::Editing(id) => self.repo.update(id, &draft, now),
        };

        match result {
            Ok(record) => {
                let message = match self.form {
                    FormMode::Editing(_) => format!("Staff member {} updated", record.name),
                    _ => format!("Staff member {} added", record.name),
                };
                self.render(doc);
                self.close_form(doc);
                self.notify(doc, timers, &message, NotificationKind::Success);
            }
            Err(PortalError::Validation(errors)) => {
                tracing::debug!(count = errors.len(), "staff form rejected");
                show_errors(doc, &errors);
            }
            Err(e) => {
                tracing::error!("staff save error: {:?}", e);
                self.notify(doc, timers, SAVE_FAILED_MESSAGE, NotificationKind::Danger);
            }
        }
    }

    /// Deletes the record open in the form after the visitor confirms.
    pub fn delete_current(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        let FormMode::Editing(id) = &self.form else {
            return;
        };
        let id = id.clone();
        if !doc.confirm(&format!("Delete staff member {id}?")) {
            return;
        }

        match self.repo.delete(&id) {
            Ok(_) => {
                self.render(doc);
                self.close_form(doc);
                self.notify(
                    doc,
                    timers,
                    &format!("Staff member {id} removed"),
                    NotificationKind::Danger,
                );
            }
            Err(e) => {
                tracing::error!("staff delete error: {:?}", e);
                self.notify(doc, timers, SAVE_FAILED_MESSAGE, NotificationKind::Danger);
            }
        }
    }

    // --- Roster Actions ---

    /// toggle_delete_mode
    ///
    /// Entering delete mode marks the container and gives every card one
    /// checkbox. Leaving it deletes the checked cards once confirmed.
    pub fn toggle_delete_mode(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        self.delete_mode = !self.delete_mode;

        if self.delete_mode {
            if let Some(container) = doc.query(Selector::Id(CONTAINER_ID)) {
                doc.add_class(container, DELETE_MODE_CLASS);
            }
            if let Some(button) = doc.query(Selector::Id(DELETE_MODE_BUTTON_ID)) {
                doc.set_text(button, EXIT_DELETE_MODE_LABEL);
                doc.set_style(button, "background", EXIT_DELETE_MODE_BACKGROUND);
            }
            self.add_delete_checkboxes(doc);
        } else {
            clear_delete_mode_view(doc);
            self.delete_selected(doc, timers);
        }
    }

    /// Writes the roster again as it stands and reports the outcome.
    pub fn save_all(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        match self.repo.persist() {
            Ok(()) => {
                self.update_stats(doc);
                self.notify(doc, timers, "Roster saved", NotificationKind::Success);
            }
            Err(e) => {
                tracing::error!("roster save error: {:?}", e);
                self.notify(doc, timers, SAVE_FAILED_MESSAGE, NotificationKind::Danger);
            }
        }
    }

    fn add_delete_checkboxes(&self, doc: &mut dyn Document) {
        for card in doc.query_all(Selector::Class(CARD_CLASS)) {
            if doc
                .query_first_within(card, Selector::Class(DELETE_CHECKBOX_CLASS))
                .is_some()
            {
                continue;
            }
            let checkbox = doc.create_element(card, "input", DELETE_CHECKBOX_CLASS);
            doc.set_attribute(checkbox, "type", "checkbox");
            doc.add_listener(checkbox, EventKind::Change);
        }
    }

    fn delete_selected(&mut self, doc: &mut dyn Document, timers: &mut TimerQueue) {
        let ids: Vec<StaffId> = doc
            .query_all(Selector::Class(DELETE_CHECKBOX_CLASS))
            .into_iter()
            .filter(|checkbox| doc.is_checked(*checkbox))
            .filter_map(|checkbox| doc.closest(checkbox, Selector::Class(CARD_CLASS)))
            .filter_map(|card| self.record_id(doc.attribute(card, CARD_ID_ATTR)))
            .collect();

        if ids.is_empty() {
            self.render(doc);
            return;
        }
        if !doc.confirm(&format!("Delete {} selected staff members?", ids.len())) {
            self.render(doc);
            return;
        }

        match self.repo.bulk_delete(&ids) {
            Ok(removed) => {
                self.render(doc);
                self.notify(
                    doc,
                    timers,
                    &format!("Staff members removed: {removed}"),
                    NotificationKind::Danger,
                );
            }
            Err(e) => {
                tracing::error!("bulk delete error: {:?}", e);
                self.render(doc);
                self.notify(doc, timers, SAVE_FAILED_MESSAGE, NotificationKind::Danger);
            }
        }
    }

    // --- Rendering ---

    /// Rebuilds every card and the head counts from the repository.
    pub fn render(&self, doc: &mut dyn Document) {
        let Some(container) = doc.query(Selector::Id(CONTAINER_ID)) else {
            tracing::warn!("staff container not found on staff page");
            return;
        };
        doc.clear_children(container);
        for record in self.repo.records() {
            self.render_card(doc, container, record);
        }
        if self.delete_mode {
            self.add_delete_checkboxes(doc);
        }
        self.update_stats(doc);
    }

    fn render_card(&self, doc: &mut dyn Document, container: ElementRef, record: &StaffRecord) {
        let tier = BadgeTier::for_level(record.level);

        let card = doc.create_element(container, "article", CARD_CLASS);
        doc.set_attribute(card, CARD_ID_ATTR, record.id.as_str());

        let header = doc.create_element(card, "div", "staff-card-header");
        let id = doc.create_element(header, "span", "id-value");
        doc.set_text(id, record.id.as_str());
        let badge = doc.create_element(
            header,
            "span",
            &format!("clearance-badge {}", tier.css_class()),
        );
        doc.set_text(badge, &format!("CLEARANCE: {}", record.level.label()));

        let body = doc.create_element(card, "div", "staff-card-body");
        let photo = doc.create_element(body, "img", "staff-photo");
        doc.set_attribute(photo, "src", &record.photo);
        doc.set_attribute(photo, "alt", &record.name);
        let status = doc.create_element(
            body,
            "div",
            &format!("status-badge {}", record.status.as_str()),
        );
        doc.set_text(status, record.status.label());

        let fields = [
            ("h3", "staff-name", record.name.clone()),
            ("p", "staff-position", record.position.clone()),
            ("span", "stat-value work-duration", record.work_duration.clone()),
            (
                "span",
                "stat-value last-access",
                record.last_access.format("%Y-%m-%d %H:%M").to_string(),
            ),
            ("p", "staff-achievements", record.achievements.clone()),
        ];
        for (tag, class, text) in fields {
            let el = doc.create_element(body, tag, class);
            doc.set_text(el, &text);
        }

        // Optional sections are left out entirely when empty.
        if !record.biometrics.is_empty() {
            let el = doc.create_element(body, "p", "staff-biometrics");
            doc.set_text(el, &record.biometrics);
        }
        if !record.personal_note.is_empty() {
            let el = doc.create_element(body, "p", "note-content");
            doc.set_text(el, &record.personal_note);
        }

        if self.can_manage {
            let edit = doc.create_element(card, "button", EDIT_BUTTON_CLASS);
            doc.set_attribute(edit, EDIT_ID_ATTR, record.id.as_str());
            doc.set_text(edit, "EDIT");
            doc.add_listener(edit, EventKind::Click);
            doc.add_listener(card, EventKind::DoubleClick);
        }
    }

    fn update_stats(&self, doc: &mut dyn Document) {
        let stats = self.repo.stats();
        for (id, count) in [
            (TOTAL_COUNT_ID, stats.total),
            (PRESENT_COUNT_ID, stats.present),
            (ABSENT_COUNT_ID, stats.absent),
        ] {
            if let Some(el) = doc.query(Selector::Id(id)) {
                doc.set_text(el, &count.to_string());
            }
        }
    }

    /// notify
    ///
    /// Shows `message` as the only staff notification and schedules its
    /// removal after `timings.notification`.
    pub fn notify(
        &mut self,
        doc: &mut dyn Document,
        timers: &mut TimerQueue,
        message: &str,
        kind: NotificationKind,
    ) -> ElementRef {
        if let Some((_, pending)) = self.notification.take() {
            timers.cancel(pending);
        }
        for stale in doc.query_all(Selector::Class(NOTIFICATION_CLASS)) {
            doc.remove_element(stale);
        }

        let body = doc.body();
        let el = doc.create_element(
            body,
            "div",
            &format!("{NOTIFICATION_CLASS} {}", kind.css_class()),
        );
        let icon = doc.create_element(el, "span", "notification-icon");
        doc.set_text(icon, kind.icon());
        let text = doc.create_element(el, "span", "notification-text");
        doc.set_text(text, message);

        let dismiss =
            timers.schedule(self.timings.notification, TimerTask::DismissNotification(el));
        self.notification = Some((el, dismiss));
        el
    }

    fn record_id(&self, raw: Option<String>) -> Option<StaffId> {
        let raw = raw?;
        self.repo.find(&raw).map(|record| record.id.clone())
    }
}

fn clear_delete_mode_view(doc: &mut dyn Document) {
    if let Some(container) = doc.query(Selector::Id(CONTAINER_ID)) {
        doc.remove_class(container, DELETE_MODE_CLASS);
    }
    if let Some(button) = doc.query(Selector::Id(DELETE_MODE_BUTTON_ID)) {
        doc.set_text(button, DELETE_MODE_LABEL);
        doc.set_style(button, "background", "");
    }
}

fn hit(doc: &dyn Document, target: ElementRef, id: &str) -> bool {
    doc.closest(target, Selector::Id(id)).is_some()
}

fn read_draft(doc: &dyn Document) -> StaffDraft {
    let field = |id: &str| {
        doc.query(Selector::Id(id))
            .map(|el| doc.value(el))
            .unwrap_or_default()
    };
    StaffDraft {
        id: field(FIELD_ID),
        name: field(FIELD_NAME),
        position: field(FIELD_POSITION),
        level: field(FIELD_LEVEL),
        status: field(FIELD_STATUS),
        biometrics: field(FIELD_BIOMETRICS),
        work_duration: field(FIELD_WORK_DURATION),
        achievements: field(FIELD_ACHIEVEMENTS),
        personal_note: field(FIELD_NOTE),
        photo: field(FIELD_PHOTO),
    }
}

fn write_draft(doc: &mut dyn Document, draft: &StaffDraft) {
    let values = [
        &draft.id,
        &draft.name,
        &draft.position,
        &draft.level,
        &draft.status,
        &draft.biometrics,
        &draft.work_duration,
        &draft.achievements,
        &draft.personal_note,
        &draft.photo,
    ];
    for (field, value) in FORM_FIELDS.into_iter().zip(values) {
        if let Some(el) = doc.query(Selector::Id(field)) {
            doc.set_value(el, value);
        }
    }
}

fn show_errors(doc: &mut dyn Document, errors: &ValidationErrors) {
    let Some(area) = doc.query(Selector::Id(FORM_ERRORS_ID)) else {
        tracing::warn!("form error area not found: {}", errors);
        return;
    };
    doc.clear_children(area);
    for error in errors.errors() {
        let line = doc.create_element(area, "p", "form-error");
        doc.set_text(line, &format!("⚠ {error}"));
    }
    doc.set_visible(area, true);
}

fn hide_errors(doc: &mut dyn Document) {
    if let Some(area) = doc.query(Selector::Id(FORM_ERRORS_ID)) {
        doc.clear_children(area);
        doc.set_visible(area, false);
    }
}
