use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- Module Structure ---

// Ambient services.
pub mod config;
pub mod error;
pub mod storage;

// Domain types and the access table.
pub mod models;
pub mod policy;

// Session, roster persistence and the page controllers built on them.
pub mod auth;
pub mod dialog;
pub mod dom;
pub mod gate;
pub mod handlers;
pub mod repository;
pub mod runtime;
pub mod timers;

// --- Public Re-exports ---

pub use auth::{SessionStore, StoredSession};
pub use config::{AppConfig, Env, Timings};
pub use dom::{Document, ElementRef, VirtualDocument};
pub use error::{PortalError, Result};
pub use gate::{GateOutcome, GateState, SessionGate};
pub use handlers::StaffPanel;
pub use models::{AccessLevel, PageKey, Session, StaffId, StaffRecord};
pub use policy::AccessPolicy;
pub use repository::RosterRepository;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreState};
pub use timers::TimerQueue;

use timers::TimerTask;

/// A key as reported by a key-down event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

/// What became of an event after the portal saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ignored,
    Handled,
    /// Handled, and the host must cancel the browser's default action
    /// (following a link).
    DefaultPrevented,
}

/// Events a host forwards from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    PageLoad,
    Click(ElementRef),
    DoubleClick(ElementRef),
    Change(ElementRef),
    KeyDown(Key),
}

/// Portal
///
/// The explicit context every page controller runs in: configuration, the
/// session gate, the staff panel while the staff page is shown, the timer
/// queue and the persistent key space. Hosts feed it `UiEvent`s and advance
/// its clock; nothing in the crate is global.
pub struct Portal {
    config: AppConfig,
    gate: SessionGate,
    staff: Option<StaffPanel>,
    timers: TimerQueue,
    roster_store: StoreState,
}

impl Portal {
    /// new
    ///
    /// `session_store` backs the per-tab session key and `roster_store` the
    /// persistent roster key; hosts may pass the same store for both.
    pub fn new(config: AppConfig, session_store: StoreState, roster_store: StoreState) -> Self {
        let sessions = SessionStore::new(session_store, config.session_key.clone());
        Self {
            gate: SessionGate::new(config.clone(), sessions),
            config,
            staff: None,
            timers: TimerQueue::new(),
            roster_store,
        }
    }

    /// bootstrap
    ///
    /// Reads `.env` and the process environment, installs tracing and builds
    /// the portal: the roster lives under `PORTAL_DATA_DIR` when set and in
    /// memory otherwise, the session always in memory.
    ///
    /// # Panics
    /// In production when `PORTAL_DATA_DIR` is missing (see `AppConfig::load`).
    pub fn bootstrap() -> Result<Self> {
        dotenv::dotenv().ok();
        let config = AppConfig::load();
        init_tracing(&config);
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Result<Self> {
        let roster_store: StoreState = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };
        let session_store: StoreState = Arc::new(MemoryStore::new());

        tracing::info!(
            env = ?config.env,
            data_dir = ?config.data_dir,
            "portal bootstrapped"
        );
        Ok(Self::new(config, session_store, roster_store))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn sessions(&self) -> &SessionStore {
        self.gate.sessions()
    }

    pub fn staff(&self) -> Option<&StaffPanel> {
        self.staff.as_ref()
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn next_timer_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// load_page
    ///
    /// Treats `doc` as a freshly loaded page: whatever belonged to the previous
    /// page (panel, dialog, timers) is taken down, the gate runs, and the staff
    /// page gets its panel when access was granted. `doc` may be the document
    /// the previous load ran on.
    pub fn load_page(&mut self, doc: &mut dyn Document) -> GateOutcome {
        if let Some(panel) = self.staff.take() {
            panel.unmount(doc, &mut self.timers);
        }
        let outcome = self.gate.on_page_load(doc, &mut self.timers);
        let dropped = self.timers.cancel_all();
        if dropped > 0 {
            tracing::debug!(dropped, "timers of the previous page dropped");
        }

        if let GateOutcome::Granted {
            session,
            page: PageKey::Staff,
        } = &outcome
        {
            let key = self.config.roster_key.clone();
            match RosterRepository::load(self.roster_store.clone(), key) {
                Ok(repo) => {
                    self.staff = Some(StaffPanel::mount(doc, repo, session, self.config.timings));
                }
                Err(e) => tracing::error!("roster load error: {:?}", e),
            }
        }
        outcome
    }

    /// dispatch
    ///
    /// Routes one event. The gate (and its dialog) sees clicks and keys first;
    /// the staff panel gets whatever the gate leaves alone.
    pub fn dispatch(&mut self, doc: &mut dyn Document, event: UiEvent) -> Dispatch {
        match event {
            UiEvent::PageLoad => {
                self.load_page(doc);
                Dispatch::Handled
            }
            UiEvent::Click(target) => {
                let outcome = self.gate.on_click(doc, &mut self.timers, target);
                if outcome != Dispatch::Ignored {
                    return outcome;
                }
                match &mut self.staff {
                    Some(panel) => panel.on_click(doc, &mut self.timers, target, Utc::now()),
                    None => Dispatch::Ignored,
                }
            }
            UiEvent::DoubleClick(target) => match &mut self.staff {
                Some(panel) => panel.on_double_click(doc, target),
                None => Dispatch::Ignored,
            },
            UiEvent::Change(target) => match &mut self.staff {
                Some(panel) => panel.on_change(doc, target),
                None => Dispatch::Ignored,
            },
            UiEvent::KeyDown(key) => {
                let handled = self.gate.on_key(doc, &mut self.timers, &key)
                    || self
                        .staff
                        .as_mut()
                        .is_some_and(|panel| panel.on_key(doc, &key));
                if handled {
                    Dispatch::Handled
                } else {
                    Dispatch::Ignored
                }
            }
        }
    }

    /// advance_clock
    ///
    /// Moves the logical clock to `until`, running every task that comes due
    /// on the way in deadline order. Returns how many tasks ran.
    pub fn advance_clock(&mut self, doc: &mut dyn Document, until: Duration) -> usize {
        let mut fired = 0;
        while let Some((id, task)) = self.timers.pop_due(until) {
            fired += 1;
            let handled = match task {
                TimerTask::DismissNotification(_) => self
                    .staff
                    .as_mut()
                    .is_some_and(|panel| panel.on_timer(doc, id, task)),
                TimerTask::BypassFailed | TimerTask::BypassReset => {
                    self.gate.on_timer(doc, &mut self.timers, id, task)
                }
            };
            if !handled {
                tracing::debug!(?task, "stale timer ignored");
            }
        }
        fired
    }

    /// Advances the clock by `delta` from where it stands.
    pub fn advance_by(&mut self, doc: &mut dyn Document, delta: Duration) -> usize {
        let until = self.timers.now() + delta;
        self.advance_clock(doc, until)
    }
}

/// init_tracing
///
/// Installs the global subscriber: pretty output locally, JSON in production.
/// `RUST_LOG` takes precedence over the built-in filter. A second call is a
/// no-op, so tests and hosts can both call it.
pub fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "facility_portal=debug".into());

    let installed = match config.env {
        Env::Local => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        Env::Production => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!("tracing initialised in {:?} mode", config.env);
    }
}
