//! Merge rules for every synced resource.

use crate::pending::Dependency;
use crate::rule::{Combined, MergeRule};
use crate::{SyncError, SyncResult};
use clinisync_model::records::{
    AppointmentRecord, AppointmentTypeRecord, AttendeeRecord, CaseRecord, LinkField,
    PatientRecord, PractitionerRecord, ReferenceNumberRecord, SourceRecord, UserRecord,
};
use clinisync_model::{AppointmentType, Patient, Practitioner};
use clinisync_source::Query;
use clinisync_types::ExternalId;

/// Stored field holding an entity's upstream id.
pub const SOURCE_ID: &str = "source.id";

/// Stored field holding a practitioner's upstream user id.
pub const USER_ID: &str = "user.id";

fn link_id<R: SourceRecord>(
    record: &R,
    link: Option<&LinkField>,
    field: &'static str,
) -> SyncResult<ExternalId> {
    link.and_then(LinkField::id)
        .ok_or(SyncError::MissingReference {
            resource: R::RESOURCE,
            id: record.id(),
            field,
        })
}

// ── Patients ────────────────────────────────────────────────────

/// Creates or refreshes patients.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatientRule;

impl MergeRule for PatientRule {
    type Record = PatientRecord;
    type Entity = Patient;

    fn query(&self) -> Query {
        Query::new().wildcard("archived_at")
    }

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &PatientRecord) -> SyncResult<ExternalId> {
        Ok(record.id)
    }

    fn allow_create(&self) -> bool {
        true
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::patient(key)
    }

    fn combine(
        &self,
        record: &PatientRecord,
        existing: Option<&Patient>,
    ) -> SyncResult<Combined<Patient>> {
        Ok(Combined::Entity(Patient::from_source(record, existing)))
    }
}

/// Attaches patient cases as referrals.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseRule;

impl MergeRule for CaseRule {
    type Record = CaseRecord;
    type Entity = Patient;

    fn query(&self) -> Query {
        Query::new().wildcard("archived_at")
    }

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &CaseRecord) -> SyncResult<ExternalId> {
        link_id(record, Some(&record.patient), "patient")
    }

    fn allow_create(&self) -> bool {
        false
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::patient(key)
    }

    fn combine(
        &self,
        record: &CaseRecord,
        existing: Option<&Patient>,
    ) -> SyncResult<Combined<Patient>> {
        match existing {
            Some(patient) => Ok(Combined::Entity(patient.with_case(record))),
            None => Ok(Combined::MissingDependency(self.missing(self.lookup_key(record)?))),
        }
    }
}

/// Attaches individual appointments to their patient.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentRule;

impl MergeRule for AppointmentRule {
    type Record = AppointmentRecord;
    type Entity = Patient;

    fn query(&self) -> Query {
        Query::new().wildcard("archived_at").wildcard("cancelled_at")
    }

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &AppointmentRecord) -> SyncResult<ExternalId> {
        link_id(record, Some(&record.patient), "patient")
    }

    fn allow_create(&self) -> bool {
        false
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::patient(key)
    }

    fn combine(
        &self,
        record: &AppointmentRecord,
        existing: Option<&Patient>,
    ) -> SyncResult<Combined<Patient>> {
        match existing {
            Some(patient) => Ok(Combined::Entity(patient.with_appointment(record))),
            None => Ok(Combined::MissingDependency(self.missing(self.lookup_key(record)?))),
        }
    }
}

/// Writes attendance details onto an appointment already on the patient.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttendeeRule;

impl MergeRule for AttendeeRule {
    type Record = AttendeeRecord;
    type Entity = Patient;

    fn query(&self) -> Query {
        Query::new().wildcard("archived_at").wildcard("cancelled_at")
    }

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &AttendeeRecord) -> SyncResult<ExternalId> {
        // Without the booking the appointment cannot be found on the patient.
        link_id(record, Some(&record.booking), "booking")?;
        link_id(record, Some(&record.patient), "patient")
    }

    fn allow_create(&self) -> bool {
        false
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::patient(key)
    }

    fn combine(
        &self,
        record: &AttendeeRecord,
        existing: Option<&Patient>,
    ) -> SyncResult<Combined<Patient>> {
        let Some(patient) = existing else {
            return Ok(Combined::MissingDependency(self.missing(self.lookup_key(record)?)));
        };
        let booking = link_id(record, Some(&record.booking), "booking")?;
        Ok(match patient.with_attendee(record, booking) {
            Some(updated) => Combined::Entity(updated),
            None => Combined::MissingDependency(Dependency::appointment(booking)),
        })
    }
}

// ── Appointment types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentTypeRule;

impl MergeRule for AppointmentTypeRule {
    type Record = AppointmentTypeRecord;
    type Entity = AppointmentType;

    fn query(&self) -> Query {
        Query::new().wildcard("archived_at")
    }

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &AppointmentTypeRecord) -> SyncResult<ExternalId> {
        Ok(record.id)
    }

    fn allow_create(&self) -> bool {
        true
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::appointment_type(key)
    }

    fn combine(
        &self,
        record: &AppointmentTypeRecord,
        _existing: Option<&AppointmentType>,
    ) -> SyncResult<Combined<AppointmentType>> {
        Ok(Combined::Entity(AppointmentType::from_source(record)))
    }
}

// ── Practitioners ───────────────────────────────────────────────

/// Creates or refreshes practitioners.
#[derive(Debug, Clone, Copy, Default)]
pub struct PractitionerRule;

impl MergeRule for PractitionerRule {
    type Record = PractitionerRecord;
    type Entity = Practitioner;

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &PractitionerRecord) -> SyncResult<ExternalId> {
        Ok(record.id)
    }

    fn allow_create(&self) -> bool {
        true
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::practitioner(key)
    }

    fn combine(
        &self,
        record: &PractitionerRecord,
        existing: Option<&Practitioner>,
    ) -> SyncResult<Combined<Practitioner>> {
        Ok(Combined::Entity(Practitioner::from_source(record, existing)))
    }
}

/// Copies user account contact details onto the linked practitioner.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserRule;

impl MergeRule for UserRule {
    type Record = UserRecord;
    type Entity = Practitioner;

    fn lookup_field(&self) -> &'static str {
        USER_ID
    }

    fn lookup_key(&self, record: &UserRecord) -> SyncResult<ExternalId> {
        Ok(record.id)
    }

    fn allow_create(&self) -> bool {
        false
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::user(key)
    }

    fn combine(
        &self,
        record: &UserRecord,
        existing: Option<&Practitioner>,
    ) -> SyncResult<Combined<Practitioner>> {
        Ok(match existing {
            Some(practitioner) => Combined::Entity(practitioner.with_user(record)),
            None => Combined::MissingDependency(self.missing(record.id)),
        })
    }
}

/// Fills in provider numbers and ABNs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceNumberRule;

impl MergeRule for ReferenceNumberRule {
    type Record = ReferenceNumberRecord;
    type Entity = Practitioner;

    fn lookup_field(&self) -> &'static str {
        SOURCE_ID
    }

    fn lookup_key(&self, record: &ReferenceNumberRecord) -> SyncResult<ExternalId> {
        link_id(record, Some(&record.practitioner), "practitioner")
    }

    fn allow_create(&self) -> bool {
        false
    }

    fn missing(&self, key: ExternalId) -> Dependency {
        Dependency::practitioner(key)
    }

    fn combine(
        &self,
        record: &ReferenceNumberRecord,
        existing: Option<&Practitioner>,
    ) -> SyncResult<Combined<Practitioner>> {
        match existing {
            Some(practitioner) => Ok(Combined::Entity(practitioner.with_reference_number(record))),
            None => Ok(Combined::MissingDependency(self.missing(self.lookup_key(record)?))),
        }
    }
}
