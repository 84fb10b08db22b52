//! Static mapping between clearance tiers and portal pages.

use crate::models::{AccessLevel, PageKey};

// Each row lists every page its level may view. Rows happen to be supersets of
// the row above; nothing below relies on that.
const PAGE_TABLE: [(AccessLevel, &[PageKey]); 4] = [
    (AccessLevel::ONE, &[PageKey::Index, PageKey::Building]),
    (
        AccessLevel::TWO,
        &[PageKey::Index, PageKey::Building, PageKey::Staff],
    ),
    (
        AccessLevel::THREE,
        &[PageKey::Index, PageKey::Building, PageKey::Staff, PageKey::Blinks],
    ),
    (
        AccessLevel::FOUR,
        &[
            PageKey::Index,
            PageKey::Building,
            PageKey::Staff,
            PageKey::Blinks,
            PageKey::Secrets,
        ],
    ),
];

/// Lowest level allowed to see the roster management surface.
pub const ROSTER_MANAGER_LEVEL: AccessLevel = AccessLevel::FOUR;

/// AccessPolicy
///
/// Stateless answers to "may this level see this page" and "what level does
/// this page need". The only place the page table lives.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Pages viewable at `level`, straight from the table.
    pub fn allowed_pages(level: AccessLevel) -> &'static [PageKey] {
        PAGE_TABLE
            .iter()
            .find(|(row, _)| *row == level)
            .map(|(_, pages)| *pages)
            .unwrap_or(&[])
    }

    /// required_level
    ///
    /// Smallest level whose row contains `page`, scanning 1 to 4. A page no
    /// row mentions requires the highest level.
    pub fn required_level(page: PageKey) -> AccessLevel {
        AccessLevel::ALL
            .into_iter()
            .find(|level| Self::allowed_pages(*level).contains(&page))
            .unwrap_or(AccessLevel::MAX)
    }

    /// Same as `required_level`, for a raw href. Unknown destinations fail closed.
    pub fn required_level_for_href(href: &str) -> AccessLevel {
        PageKey::from_href(href)
            .map(Self::required_level)
            .unwrap_or(AccessLevel::MAX)
    }

    pub fn can_view(level: AccessLevel, page: PageKey) -> bool {
        Self::allowed_pages(level).contains(&page)
    }

    /// can_access
    ///
    /// `can_view` for an href or path. `./staff.html`, `staff.html` and
    /// `/portal/staff.html` all compare equal; anything that is not a known
    /// page is denied.
    pub fn can_access(level: AccessLevel, href: &str) -> bool {
        PageKey::from_href(href).is_some_and(|page| Self::can_view(level, page))
    }

    /// Whether `level` gets the roster add/edit/delete surface.
    pub fn can_manage_roster(level: AccessLevel) -> bool {
        level >= ROSTER_MANAGER_LEVEL
    }
}

/// BadgeTier
///
/// Colour treatment for clearance badges. Four tiers keyed on "at least".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTier {
    Critical,
    High,
    Elevated,
    Basic,
}

impl BadgeTier {
    pub fn for_level(level: AccessLevel) -> Self {
        if level >= AccessLevel::FOUR {
            BadgeTier::Critical
        } else if level >= AccessLevel::THREE {
            BadgeTier::High
        } else if level >= AccessLevel::TWO {
            BadgeTier::Elevated
        } else {
            BadgeTier::Basic
        }
    }

    pub fn background(self) -> &'static str {
        match self {
            BadgeTier::Critical => "rgba(255, 0, 64, 0.3)",
            BadgeTier::High => "rgba(255, 165, 0, 0.3)",
            BadgeTier::Elevated => "rgba(0, 255, 234, 0.3)",
            BadgeTier::Basic => "rgba(0, 128, 0, 0.3)",
        }
    }

    /// Text colour, also used for the border.
    pub fn color(self) -> &'static str {
        match self {
            BadgeTier::Critical => "#ff6666",
            BadgeTier::High => "#ffaa00",
            BadgeTier::Elevated => "#00ffea",
            BadgeTier::Basic => "#80ff80",
        }
    }

    /// Class applied to roster clearance badges.
    pub fn css_class(self) -> &'static str {
        match self {
            BadgeTier::Critical => "level-4",
            BadgeTier::High => "level-3",
            BadgeTier::Elevated => "level-2",
            BadgeTier::Basic => "level-1",
        }
    }
}
