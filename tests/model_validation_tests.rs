use chrono::{TimeZone, Utc};
use facility_portal::{
    AccessLevel, Session, StaffId, StaffRecord,
    error::ValidationError,
    models::{DEFAULT_PHOTO, RosterStats, StaffDraft, StaffStatus},
    repository::seed_roster,
};

fn valid_draft(id: &str) -> StaffDraft {
    StaffDraft {
        id: id.to_string(),
        name: "Dr. Mira Kovac".to_string(),
        position: "VIROLOGIST".to_string(),
        level: "3".to_string(),
        status: "present".to_string(),
        achievements: "Isolated strain K-7".to_string(),
        ..StaffDraft::default()
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

// --- Staff Id ---

#[test]
fn test_staff_id_accepts_latin_and_cyrillic() {
    for raw in ["ГЕН-01-АЛЬФА", "LAB-123-X9Z", "БИО-07-СИГ", "ABC-00-ABCDE"] {
        assert!(StaffId::parse(raw).is_ok(), "{raw} should be valid");
    }
}

#[test]
fn test_staff_id_rejects_bad_shapes() {
    for raw in [
        "abc",
        "gen-01-alpha",
        "AB-01-ABC",
        "ABC-1-ABC",
        "ABC-1234-ABC",
        "ABC-01-AB",
        "ABC-01-ABCDEF",
        "",
    ] {
        assert_eq!(StaffId::parse(raw), Err(ValidationError::InvalidId), "{raw:?}");
    }
}

#[test]
fn test_staff_id_is_trimmed_before_validation() {
    let id = StaffId::parse("  ЛАБ-21-КАППА \n").unwrap();
    assert_eq!(id.as_str(), "ЛАБ-21-КАППА");
}

#[test]
fn test_generated_ids_are_valid() {
    for _ in 0..200 {
        let id = StaffId::generate();
        assert!(StaffId::parse(id.as_str()).is_ok(), "generated {id} must validate");
    }
}

// --- Draft Validation ---

#[test]
fn test_valid_draft_becomes_record() {
    let record = valid_draft("ИСС-44-ДЕЛЬТ").validate(&[], None, now()).unwrap();

    assert_eq!(record.id.as_str(), "ИСС-44-ДЕЛЬТ");
    assert_eq!(record.level, AccessLevel::THREE);
    assert_eq!(record.status, StaffStatus::Present);
    assert_eq!(record.photo, DEFAULT_PHOTO);
    assert_eq!(record.last_access, now());
}

#[test]
fn test_draft_fields_are_trimmed() {
    let mut draft = valid_draft(" ИСС-44-ДЕЛЬТ ");
    draft.name = "  Dr. Mira Kovac ".to_string();
    draft.photo = " images/staff/mira.jpg ".to_string();

    let record = draft.validate(&[], None, now()).unwrap();

    assert_eq!(record.name, "Dr. Mira Kovac");
    assert_eq!(record.photo, "images/staff/mira.jpg");
}

#[test]
fn test_all_violations_accumulate() {
    let draft = StaffDraft {
        id: "abc".to_string(),
        level: "9".to_string(),
        status: "missing".to_string(),
        ..StaffDraft::default()
    };

    let errors = draft.validate(&[], None, now()).unwrap_err();

    assert_eq!(
        errors.errors(),
        &[
            ValidationError::InvalidId,
            ValidationError::EmptyName,
            ValidationError::EmptyPosition,
            ValidationError::EmptyAchievements,
            ValidationError::InvalidAccessLevel,
            ValidationError::InvalidStatus,
        ]
    );
    assert_eq!(errors.to_string().lines().count(), 6);
}

#[test]
fn test_whitespace_only_required_fields_are_empty() {
    let mut draft = valid_draft("ИСС-44-ДЕЛЬТ");
    draft.name = "   ".to_string();

    let errors = draft.validate(&[], None, now()).unwrap_err();
    assert_eq!(errors.errors(), &[ValidationError::EmptyName]);
}

#[test]
fn test_duplicate_id_rejected_on_create() {
    let roster = seed_roster();
    let errors = valid_draft("ГЕН-01-АЛЬФА").validate(&roster, None, now()).unwrap_err();
    assert!(errors.contains(&ValidationError::DuplicateId("ГЕН-01-АЛЬФА".to_string())));
}

#[test]
fn test_edit_may_keep_own_id_but_not_take_another() {
    let roster = seed_roster();
    let own = StaffId::parse("ГЕН-01-АЛЬФА").unwrap();

    assert!(valid_draft("ГЕН-01-АЛЬФА").validate(&roster, Some(&own), now()).is_ok());

    let errors = valid_draft("БИО-07-СИГМА")
        .validate(&roster, Some(&own), now())
        .unwrap_err();
    assert!(errors.contains(&ValidationError::DuplicateId("БИО-07-СИГМА".to_string())));
}

#[test]
fn test_blank_draft_defaults() {
    let draft = StaffDraft::blank(StaffId::parse("ТЕХ-55-NEW").unwrap());
    assert_eq!(draft.level, "1");
    assert_eq!(draft.status, "present");
    assert!(draft.name.is_empty());
}

// --- Serialization ---

#[test]
fn test_session_rejects_out_of_range_level() {
    assert!(serde_json::from_str::<Session>(r#"{"name":"x","level":9}"#).is_err());
    assert!(serde_json::from_str::<Session>(r#"{"name":"x","level":0}"#).is_err());

    let session: Session = serde_json::from_str(r#"{"name":"x","level":2}"#).unwrap();
    assert_eq!(session.level, AccessLevel::TWO);
}

#[test]
fn test_record_serializes_camel_case() {
    let record = valid_draft("ИСС-44-ДЕЛЬТ").validate(&[], None, now()).unwrap();
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["level"], 3);
    assert_eq!(json["status"], "present");
    assert!(json.get("workDuration").is_some());
    assert!(json.get("lastAccess").is_some());

    let back: StaffRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_seed_roster_stats() {
    let roster = seed_roster();
    assert_eq!(
        RosterStats::from_records(&roster),
        RosterStats {
            total: 5,
            present: 4,
            absent: 1
        }
    );
}
