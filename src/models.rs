use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ValidationError, ValidationErrors};

// --- Access Levels & Pages ---

/// AccessLevel
///
/// A clearance tier in `1..=4`. Levels are totally ordered and a higher level
/// reaches every page a lower one does. Serialized as a bare integer; values
/// outside the range are rejected at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "u8", into = "u8")]
pub struct AccessLevel(u8);

/// Raised when a raw integer is not a valid clearance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access level {0} is outside 1..=4")]
pub struct InvalidAccessLevel(pub u8);

impl AccessLevel {
    pub const ONE: AccessLevel = AccessLevel(1);
    pub const TWO: AccessLevel = AccessLevel(2);
    pub const THREE: AccessLevel = AccessLevel(3);
    pub const FOUR: AccessLevel = AccessLevel(4);

    /// The highest tier, also the fail-closed answer for unknown pages.
    pub const MAX: AccessLevel = AccessLevel::FOUR;

    pub const ALL: [AccessLevel; 4] = [Self::ONE, Self::TWO, Self::THREE, Self::FOUR];

    pub fn new(raw: u8) -> Option<Self> {
        (1..=4).contains(&raw).then_some(Self(raw))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// `LEVEL-<n>`, the form used by badges and the access dialog.
    pub fn label(self) -> String {
        format!("LEVEL-{}", self.0)
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = InvalidAccessLevel;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(InvalidAccessLevel(raw))
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PageKey
///
/// The fixed set of portal pages the gate redirects between. The login page is
/// not a member: it is never gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageKey {
    Index,
    Building,
    Staff,
    Blinks,
    Secrets,
}

impl PageKey {
    pub const ALL: [PageKey; 5] = [
        PageKey::Index,
        PageKey::Building,
        PageKey::Staff,
        PageKey::Blinks,
        PageKey::Secrets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PageKey::Index => "index",
            PageKey::Building => "building",
            PageKey::Staff => "staff",
            PageKey::Blinks => "blinks",
            PageKey::Secrets => "secrets",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.html", self.name())
    }

    /// from_href
    ///
    /// Resolves an href or location path to a page. A leading `./` is
    /// stripped, only the last path segment is considered, and both `staff`
    /// and `staff.html` are accepted. An empty segment is the directory
    /// index. Anything else, including the `#` placeholder of a restricted
    /// link, is `None`.
    pub fn from_href(href: &str) -> Option<PageKey> {
        let trimmed = href.trim();
        let stripped = trimmed.strip_prefix("./").unwrap_or(trimmed);
        let segment = stripped.rsplit('/').next().unwrap_or_default();
        let name = segment.strip_suffix(".html").unwrap_or(segment);

        if name.is_empty() {
            return Some(PageKey::Index);
        }
        PageKey::ALL.into_iter().find(|page| page.name() == name)
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Session ---

/// Session
///
/// The tab-scoped identity written at login and read on every page load.
/// Client-controlled: nothing here is a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub name: String,
    pub level: AccessLevel,
}

// --- Staff Roster ---

static STAFF_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-ZА-Я]{3}-[0-9]{2,3}-[A-ZА-Я0-9]{3,5}$").expect("staff id pattern compiles")
});

const ID_PREFIXES: [&str; 7] = ["ГЕН", "БИО", "ТЕХ", "АДМ", "ОХР", "ИСС", "ЛАБ"];
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Photo used when a record is saved without one.
pub const DEFAULT_PHOTO: &str = "images/staff/default.jpg";

/// StaffId
///
/// A roster key of the form `XXX-NN-XXXXX`: three upper-case Latin or Cyrillic
/// letters, two or three digits, and three to five upper-case alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct StaffId(String);

impl StaffId {
    /// Trims surrounding whitespace, then checks the pattern.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if STAFF_ID_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidId)
        }
    }

    /// generate
    ///
    /// Suggests an identifier for the add form. Uniqueness is not guaranteed;
    /// the duplicate check at save time still applies.
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let prefix = ID_PREFIXES[bytes[0] as usize % ID_PREFIXES.len()];
        let number = 10 + u32::from(bytes[1]) % 90;
        let suffix: String = bytes[2..7]
            .iter()
            .map(|b| BASE36[*b as usize % BASE36.len()] as char)
            .collect();
        Self(format!("{prefix}-{number}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StaffStatus {
    Present,
    Absent,
}

impl StaffStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "present" => Some(StaffStatus::Present),
            "absent" => Some(StaffStatus::Absent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StaffStatus::Present => "present",
            StaffStatus::Absent => "absent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StaffStatus::Present => "ON SITE",
            StaffStatus::Absent => "ABSENT",
        }
    }
}

/// StaffRecord
///
/// One roster entry as persisted under the roster key. Keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StaffRecord {
    pub id: StaffId,
    pub name: String,
    pub position: String,
    pub level: AccessLevel,
    pub status: StaffStatus,
    #[serde(default)]
    pub biometrics: String,
    #[serde(default)]
    pub work_duration: String,
    pub achievements: String,
    #[serde(default)]
    pub personal_note: String,
    pub photo: String,
    #[ts(type = "string")]
    pub last_access: DateTime<Utc>,
}

/// StaffDraft
///
/// Raw values as read from the staff form. The only way from user input to a
/// `StaffRecord` is `validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffDraft {
    pub id: String,
    pub name: String,
    pub position: String,
    pub level: String,
    pub status: String,
    pub biometrics: String,
    pub work_duration: String,
    pub achievements: String,
    pub personal_note: String,
    pub photo: String,
}

impl StaffDraft {
    /// Defaults for the add form: level 1, present, a suggested id.
    pub fn blank(id: StaffId) -> Self {
        Self {
            id: id.to_string(),
            level: AccessLevel::ONE.to_string(),
            status: StaffStatus::Present.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn from_record(record: &StaffRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name.clone(),
            position: record.position.clone(),
            level: record.level.to_string(),
            status: record.status.as_str().to_string(),
            biometrics: record.biometrics.clone(),
            work_duration: record.work_duration.clone(),
            achievements: record.achievements.clone(),
            personal_note: record.personal_note.clone(),
            photo: record.photo.clone(),
        }
    }

    /// validate
    ///
    /// Checks every rule and reports all violations together. `editing` is the
    /// id of the record being replaced (`None` when creating); a draft may keep
    /// its own id but may not take one owned by another record.
    pub fn validate(
        &self,
        roster: &[StaffRecord],
        editing: Option<&StaffId>,
        now: DateTime<Utc>,
    ) -> Result<StaffRecord, ValidationErrors> {
        let mut errors = Vec::new();

        let id = StaffId::parse(&self.id).map_err(|e| errors.push(e)).ok();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        if self.position.trim().is_empty() {
            errors.push(ValidationError::EmptyPosition);
        }
        if self.achievements.trim().is_empty() {
            errors.push(ValidationError::EmptyAchievements);
        }

        if let Some(id) = &id {
            let taken = roster
                .iter()
                .any(|existing| existing.id == *id && Some(&existing.id) != editing);
            if taken {
                errors.push(ValidationError::DuplicateId(id.to_string()));
            }
        }

        let level = self.level.trim().parse::<u8>().ok().and_then(AccessLevel::new);
        if level.is_none() {
            errors.push(ValidationError::InvalidAccessLevel);
        }

        let status = StaffStatus::parse(&self.status);
        if status.is_none() {
            errors.push(ValidationError::InvalidStatus);
        }

        // Every `None` above pushed an error, so the fallback arm is never empty.
        match (id, level, status) {
            (Some(id), Some(level), Some(status)) if errors.is_empty() => {
                let photo = match self.photo.trim() {
                    "" => DEFAULT_PHOTO.to_string(),
                    photo => photo.to_string(),
                };
                Ok(StaffRecord {
                    id,
                    name: self.name.trim().to_string(),
                    position: self.position.trim().to_string(),
                    level,
                    status,
                    biometrics: self.biometrics.trim().to_string(),
                    work_duration: self.work_duration.trim().to_string(),
                    achievements: self.achievements.trim().to_string(),
                    personal_note: self.personal_note.trim().to_string(),
                    photo,
                    last_access: now,
                })
            }
            _ => Err(ValidationErrors(errors)),
        }
    }
}

/// RosterStats
///
/// Head counts shown above the roster, recomputed after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RosterStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

impl RosterStats {
    pub fn from_records(records: &[StaffRecord]) -> Self {
        let total = records.len();
        let present = records
            .iter()
            .filter(|r| r.status == StaffStatus::Present)
            .count();
        Self {
            total,
            present,
            absent: total - present,
        }
    }
}
