use chrono::{DateTime, TimeZone, Utc};

use crate::{
    error::{PortalError, Result},
    models::{AccessLevel, RosterStats, StaffDraft, StaffId, StaffRecord, StaffStatus},
    storage::StoreState,
};

/// RosterRepository
///
/// The staff roster: an in-memory list mirrored to one key of the persistent
/// store. Every mutation is staged on a copy, the full copy is written, and
/// only then does it replace the live list, so a failed write leaves both the
/// store and memory at the previous state.
pub struct RosterRepository {
    store: StoreState,
    key: String,
    records: Vec<StaffRecord>,
}

impl RosterRepository {
    /// load
    ///
    /// Reads the roster from `key`. An absent key is seeded with the initial
    /// roster, which is persisted straight away.
    pub fn load(store: StoreState, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let records = match store.get(&key)? {
            Some(raw) => serde_json::from_str::<Vec<StaffRecord>>(&raw).map_err(|source| {
                PortalError::Corrupt {
                    key: key.clone(),
                    source,
                }
            })?,
            None => {
                let seeded = seed_roster();
                tracing::info!(key = %key, count = seeded.len(), "seeding roster");
                write_all(&store, &key, &seeded)?;
                seeded
            }
        };

        Ok(Self {
            store,
            key,
            records,
        })
    }

    pub fn records(&self) -> &[StaffRecord] {
        &self.records
    }

    pub fn get(&self, id: &StaffId) -> Option<&StaffRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    /// Looks a record up by the raw id string a card or button carries.
    pub fn find(&self, raw_id: &str) -> Option<&StaffRecord> {
        self.records.iter().find(|r| r.id.as_str() == raw_id)
    }

    pub fn stats(&self) -> RosterStats {
        RosterStats::from_records(&self.records)
    }

    /// add
    ///
    /// Validates `draft` as a new record (its id must be unused) and appends it.
    pub fn add(&mut self, draft: &StaffDraft, now: DateTime<Utc>) -> Result<StaffRecord> {
        let record = draft.validate(&self.records, None, now)?;

        let mut staged = self.records.clone();
        staged.push(record.clone());
        self.commit(staged)?;

        tracing::info!(id = %record.id, "staff member added");
        Ok(record)
    }

    /// update
    ///
    /// Replaces the record currently stored as `id`, in place. The draft may
    /// carry a new id as long as no other record holds it.
    pub fn update(
        &mut self,
        id: &StaffId,
        draft: &StaffDraft,
        now: DateTime<Utc>,
    ) -> Result<StaffRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == *id)
            .ok_or_else(|| PortalError::UnknownStaff(id.to_string()))?;
        let record = draft.validate(&self.records, Some(id), now)?;

        let mut staged = self.records.clone();
        staged[index] = record.clone();
        self.commit(staged)?;

        tracing::info!(id = %id, new_id = %record.id, "staff member updated");
        Ok(record)
    }

    /// Returns false when no record had that id; nothing is written then.
    pub fn delete(&mut self, id: &StaffId) -> Result<bool> {
        Ok(self.bulk_delete(std::slice::from_ref(id))? == 1)
    }

    /// bulk_delete
    ///
    /// Removes every record whose id is listed and writes once. Returns how
    /// many records went away.
    pub fn bulk_delete(&mut self, ids: &[StaffId]) -> Result<usize> {
        let staged: Vec<StaffRecord> = self
            .records
            .iter()
            .filter(|r| !ids.contains(&r.id))
            .cloned()
            .collect();
        let removed = self.records.len() - staged.len();
        if removed == 0 {
            return Ok(0);
        }
        self.commit(staged)?;

        tracing::info!(removed, "staff members removed");
        Ok(removed)
    }

    /// Writes the current roster again, unchanged.
    pub fn persist(&self) -> Result<()> {
        write_all(&self.store, &self.key, &self.records)
    }

    fn commit(&mut self, staged: Vec<StaffRecord>) -> Result<()> {
        write_all(&self.store, &self.key, &staged)?;
        self.records = staged;
        Ok(())
    }
}

fn write_all(store: &StoreState, key: &str, records: &[StaffRecord]) -> Result<()> {
    let payload = serde_json::to_string(records).map_err(|source| PortalError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &payload).map_err(|e| {
        tracing::error!("roster write error: {:?}", e);
        PortalError::from(e)
    })
}

/// seed_roster
///
/// The roster a fresh browser starts with.
pub fn seed_roster() -> Vec<StaffRecord> {
    let stamp = |day: u32, hour: u32, minute: u32| {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0)
            .single()
            .unwrap_or_default()
    };

    let seed = [
        (
            "ГЕН-01-АЛЬФА",
            "Dr. Alexander Volkov",
            "CHIEF GENETICIST, PROJECT LEAD",
            AccessLevel::FOUR,
            StaffStatus::Present,
            "DNA profile 784-AΩ, fingerprints on file",
            "3 years 4 months",
            "Doctor of Biological Sciences, state prize laureate",
            "Keeps pushing to accelerate the trials.",
            "images/staff/geneticist.jpg",
            stamp(14, 8, 30),
        ),
        (
            "БИО-07-СИГМА",
            "Dr. Irina Sokolova",
            "HEAD OF BIOCONTAINMENT",
            AccessLevel::THREE,
            StaffStatus::Present,
            "Retina scan registered",
            "2 years 9 months",
            "Designed the level-3 containment protocol",
            "",
            "images/staff/biocontainment.jpg",
            stamp(14, 7, 55),
        ),
        (
            "ТЕХ-12-ОМЕГА",
            "Pavel Orlov",
            "SYSTEMS ENGINEER",
            AccessLevel::TWO,
            StaffStatus::Absent,
            "",
            "1 year 2 months",
            "Rebuilt the facility access-control network",
            "On leave after the blackout incident.",
            "images/staff/engineer.jpg",
            stamp(11, 18, 10),
        ),
        (
            "ОХР-03-БЕТА",
            "Sergei Lebedev",
            "SECURITY SHIFT SUPERVISOR",
            AccessLevel::TWO,
            StaffStatus::Present,
            "Voiceprint registered",
            "5 years",
            "Five years of perimeter duty without an incident",
            "",
            "images/staff/security.jpg",
            stamp(14, 6, 0),
        ),
        (
            "ЛАБ-21-КАППА",
            "Anna Markova",
            "LABORATORY ASSISTANT",
            AccessLevel::ONE,
            StaffStatus::Present,
            "",
            "7 months",
            "Maintains the sample archive",
            "",
            "images/staff/assistant.jpg",
            stamp(14, 9, 15),
        ),
    ];

    seed.into_iter()
        .filter_map(|entry| {
            let (
                id,
                name,
                position,
                level,
                status,
                biometrics,
                tenure,
                achievements,
                note,
                photo,
                last_access,
            ) = entry;
            Some(StaffRecord {
                id: StaffId::parse(id).ok()?,
                name: name.to_string(),
                position: position.to_string(),
                level,
                status,
                biometrics: biometrics.to_string(),
                work_duration: tenure.to_string(),
                achievements: achievements.to_string(),
                personal_note: note.to_string(),
                photo: photo.to_string(),
                last_access,
            })
        })
        .collect()
}
