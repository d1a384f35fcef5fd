//! Upstream wire records.
//!
//! Field names follow the upstream JSON. Only the fields the sync engine
//! reads are declared; unknown fields are ignored.

use chrono::{DateTime, NaiveDate, Utc};
use clinisync_types::ExternalId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A record type served by one upstream listing resource.
pub trait SourceRecord: DeserializeOwned + Send + Sync + 'static {
    /// Resource path, which is also the JSON field holding the page's items.
    const RESOURCE: &'static str;

    /// Upstream id of this record.
    fn id(&self) -> ExternalId;
}

macro_rules! source_record {
    ($ty:ty, $resource:literal) => {
        impl SourceRecord for $ty {
            const RESOURCE: &'static str = $resource;

            fn id(&self) -> ExternalId {
                self.id
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: String,
}

/// A reference to another upstream record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkField {
    pub links: Links,
}

impl LinkField {
    /// Id of the referenced record, parsed from its link.
    #[must_use]
    pub fn id(&self) -> Option<ExternalId> {
        ExternalId::from_link(&self.links.self_link)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    pub phone_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PronounsRecord {
    pub accusative: String,
    pub nominative: String,
    pub predicative_possessive: String,
    pub pronominal_possessive: String,
    pub reflexive: String,
}

// ── Patients ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PatientRecord {
    pub id: ExternalId,
    #[serde(rename = "address_1")]
    pub address1: Option<String>,
    #[serde(rename = "address_2")]
    pub address2: Option<String>,
    #[serde(rename = "address_3")]
    pub address3: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub first_name: String,
    pub gender_identity: Option<String>,
    pub last_name: String,
    pub medicare: Option<String>,
    pub medicare_reference_number: Option<String>,
    #[serde(default)]
    pub patient_phone_numbers: Option<Vec<PhoneNumber>>,
    pub post_code: Option<String>,
    pub preferred_first_name: Option<String>,
    #[serde(default)]
    pub pronouns: Option<PronounsRecord>,
    pub referral_source: Option<String>,
    pub sex: Option<String>,
    pub state: Option<String>,
    pub updated_at: DateTime<Utc>,
}
source_record!(PatientRecord, "patients");

#[derive(Debug, Clone, Deserialize)]
pub struct CaseRecord {
    pub id: ExternalId,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed: bool,
    #[serde(default)]
    pub contact: Option<LinkField>,
    pub expiry_date: Option<NaiveDate>,
    pub issue_date: Option<NaiveDate>,
    pub max_sessions: Option<u32>,
    pub name: String,
    pub patient: LinkField,
}
source_record!(CaseRecord, "patient_cases");

// ── Appointments ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRecord {
    pub id: ExternalId,
    pub archived_at: Option<DateTime<Utc>>,
    pub booking_ip_address: Option<String>,
    pub cancellation_note: Option<String>,
    pub cancellation_reason_description: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub did_not_arrive: Option<bool>,
    pub ends_at: DateTime<Utc>,
    pub patient: LinkField,
    pub patient_arrived: bool,
    #[serde(default)]
    pub patient_case: Option<LinkField>,
    pub practitioner: LinkField,
    pub starts_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
source_record!(AppointmentRecord, "individual_appointments");

#[derive(Debug, Clone, Deserialize)]
pub struct AttendeeRecord {
    pub id: ExternalId,
    pub booking: LinkField,
    pub cancellation_url: Option<String>,
    pub patient: LinkField,
    pub telehealth_url: Option<String>,
}
source_record!(AttendeeRecord, "attendees");

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentTypeRecord {
    pub id: ExternalId,
    pub name: String,
    pub max_attendees: Option<u32>,
    pub telehealth_enabled: bool,
}
source_record!(AppointmentTypeRecord, "appointment_types");

// ── Practitioners ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PractitionerRecord {
    pub id: ExternalId,
    pub active: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub designation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<LinkField>,
}
source_record!(PractitionerRecord, "practitioners");

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: ExternalId,
    pub created_at: DateTime<Utc>,
    pub email: String,
    #[serde(default)]
    pub phone_numbers: Option<Vec<PhoneNumber>>,
    pub updated_at: DateTime<Utc>,
}
source_record!(UserRecord, "users");

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceNumberRecord {
    pub id: ExternalId,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub practitioner: LinkField,
    pub reference_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}
source_record!(ReferenceNumberRecord, "practitioner_reference_numbers");
