use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// AppConfig
///
/// Holds the portal's entire configuration state. This struct is immutable once
/// loaded and is cloned into every component that needs a storage key, a page
/// name or a timing value, so the whole portal agrees on the same values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which persistent store is used.
    pub env: Env,
    // Session-scoped key holding the serialized `{name, level}` identity.
    pub session_key: String,
    // Persistent key holding the serialized roster array.
    pub roster_key: String,
    // Page every unauthenticated visitor is sent to.
    pub login_page: String,
    // Page offered as the way out of the access-denied notice.
    pub home_page: String,
    // Directory backing the persistent key space. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub timings: Timings,
}

/// Env
///
/// Defines the runtime context: local development (pretty logs, in-memory
/// roster unless a data directory is given) or production (JSON logs,
/// file-backed roster).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Timings
///
/// Delays for the cosmetic timer sequences. None of these affect session or
/// roster state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timings {
    /// How long the bypass control stays in its busy state before failing.
    pub bypass_busy: Duration,
    /// How long the failure state is shown before the dialog resets and closes.
    pub bypass_reset: Duration,
    /// Lifetime of a staff-page notification toast.
    pub notification: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            bypass_busy: Duration::from_millis(2000),
            bypass_reset: Duration::from_millis(1000),
            notification: Duration::from_millis(3000),
        }
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a non-panicking AppConfig used by tests and by hosts that do
    /// not read the environment. Everything stays in memory.
    fn default() -> Self {
        Self {
            env: Env::Local,
            session_key: "ibki_user".to_string(),
            roster_key: "ibki_staff_data".to_string(),
            login_page: "login.html".to_string(),
            home_page: "index.html".to_string(),
            data_dir: None,
            timings: Timings::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, falling back to the
    /// defaults above for anything unset.
    ///
    /// # Panics
    /// Panics in `Env::Production` when `PORTAL_DATA_DIR` is not set: a
    /// production portal without a persistent store would silently lose the
    /// roster on every restart.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let data_dir = match env {
            Env::Production => Some(PathBuf::from(
                env::var("PORTAL_DATA_DIR")
                    .expect("FATAL: PORTAL_DATA_DIR must be set in production."),
            )),
            Env::Local => env::var("PORTAL_DATA_DIR").ok().map(PathBuf::from),
        };

        let timings = Timings {
            bypass_busy: millis_var("PORTAL_BYPASS_BUSY_MS")
                .unwrap_or(defaults.timings.bypass_busy),
            bypass_reset: millis_var("PORTAL_BYPASS_RESET_MS")
                .unwrap_or(defaults.timings.bypass_reset),
            notification: millis_var("PORTAL_NOTIFICATION_MS")
                .unwrap_or(defaults.timings.notification),
        };

        Self {
            env,
            session_key: env::var("PORTAL_SESSION_KEY").unwrap_or(defaults.session_key),
            roster_key: env::var("PORTAL_ROSTER_KEY").unwrap_or(defaults.roster_key),
            login_page: env::var("PORTAL_LOGIN_PAGE").unwrap_or(defaults.login_page),
            home_page: env::var("PORTAL_HOME_PAGE").unwrap_or(defaults.home_page),
            data_dir,
            timings,
        }
    }
}

// Unparseable values fall back to the default instead of failing startup.
fn millis_var(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring non-numeric timing override");
            None
        }
    }
}
