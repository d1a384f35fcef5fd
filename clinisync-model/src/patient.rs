use crate::records::{AppointmentRecord, AttendeeRecord, CaseRecord, PatientRecord};
use crate::shared::{phones_from_source, Address, Name, Person, Pronouns, SourceMeta};
use crate::{non_blank, upsert_by, Entity};
use chrono::{DateTime, NaiveDate, Utc};
use clinisync_diff::{diffable_object, diffable_scalar, Keyed};
use clinisync_types::ExternalId;
use serde::{Deserialize, Serialize};

/// A patient document.
///
/// `referrals` and `appointments` are assembled from the patient-case and
/// appointment feeds. `note`, `ndis_number`, `emergency_contact`, `claimant`
/// and `billing_info` are locally owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub label: String,
    pub source: SourceMeta,
    pub person: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicare: Option<MedicareCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndis_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimant: Option<Claimant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_info: Option<BillingInfo>,
    #[serde(default)]
    pub referrals: Vec<Referral>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}
diffable_object!(Patient {
    label,
    source,
    person,
    medicare,
    marketing_source,
    note,
    ndis_number,
    emergency_contact,
    claimant,
    billing_info,
    referrals,
    appointments,
});

impl Entity for Patient {
    const COLLECTION: &'static str = "patients";

    fn external_id(&self) -> ExternalId {
        self.source.id
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Patient {
    /// Builds a patient from its upstream record, keeping locally-owned
    /// fields and the assembled lists from `existing`.
    #[must_use]
    pub fn from_source(record: &PatientRecord, existing: Option<&Patient>) -> Patient {
        let name = Name {
            first: record.first_name.clone(),
            preferred: non_blank(record.preferred_first_name.as_deref()),
            last: record.last_name.clone(),
        };
        let address = Address {
            line1: non_blank(record.address1.as_deref()),
            line2: non_blank(record.address2.as_deref()),
            line3: non_blank(record.address3.as_deref()),
            post_code: record
                .post_code
                .as_deref()
                .and_then(|code| code.trim().parse().ok()),
            city: non_blank(record.city.as_deref()),
            state: non_blank(record.state.as_deref()),
            country: non_blank(record.country.as_deref()),
        };

        Patient {
            label: name.full(true),
            source: SourceMeta {
                id: record.id,
                created: Some(record.created_at),
                modified: Some(record.updated_at),
                archived: record.archived_at,
            },
            person: Person {
                name,
                dob: record.date_of_birth,
                email: non_blank(record.email.as_deref()),
                address: address.non_empty(),
                gender: non_blank(record.gender_identity.as_deref()),
                sex: non_blank(record.sex.as_deref()),
                pronouns: record.pronouns.as_ref().map(Pronouns::from),
                phones: Some(phones_from_source(
                    record.patient_phone_numbers.as_deref().unwrap_or_default(),
                )),
            },
            medicare: MedicareCard::from_source(
                record.medicare.as_deref(),
                record.medicare_reference_number.as_deref(),
            ),
            marketing_source: non_blank(record.referral_source.as_deref()),
            note: existing.and_then(|p| p.note.clone()),
            ndis_number: existing.and_then(|p| p.ndis_number),
            emergency_contact: existing.and_then(|p| p.emergency_contact.clone()),
            claimant: existing.and_then(|p| p.claimant.clone()),
            billing_info: existing.and_then(|p| p.billing_info.clone()),
            referrals: existing.map(|p| p.referrals.clone()).unwrap_or_default(),
            appointments: existing.map(|p| p.appointments.clone()).unwrap_or_default(),
        }
    }

    /// Returns a copy with the referral for `case` added or replaced.
    #[must_use]
    pub fn with_case(&self, case: &CaseRecord) -> Patient {
        Patient {
            referrals: upsert_by(
                &self.referrals,
                |referral| referral.source.id == case.id,
                |_| Referral::from_source(case),
            ),
            ..self.clone()
        }
    }

    /// Returns a copy with the appointment for `record` added or updated.
    #[must_use]
    pub fn with_appointment(&self, record: &AppointmentRecord) -> Patient {
        Patient {
            appointments: upsert_by(
                &self.appointments,
                |appointment| appointment.source.id == record.id,
                |existing| Appointment::from_source(record, existing),
            ),
            ..self.clone()
        }
    }

    /// Returns a copy with the attendance URLs of `attendee` written onto the
    /// appointment `booking`, or `None` if that appointment is not on this
    /// patient yet.
    #[must_use]
    pub fn with_attendee(&self, attendee: &AttendeeRecord, booking: ExternalId) -> Option<Patient> {
        let index = self
            .appointments
            .iter()
            .position(|appointment| appointment.source.id == booking)?;

        let mut updated = self.clone();
        updated.appointments[index] = self.appointments[index].with_attendee(attendee);
        Some(updated)
    }

    /// Whether an appointment with this upstream id is attached.
    #[must_use]
    pub fn has_appointment(&self, id: ExternalId) -> bool {
        self.appointments.iter().any(|a| a.source.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicareCard {
    pub number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irn: Option<u8>,
}
diffable_object!(MedicareCard { number, irn });

impl MedicareCard {
    /// Parses the upstream card number and individual reference number.
    /// Returns `None` unless the number is numeric.
    #[must_use]
    pub fn from_source(number: Option<&str>, irn: Option<&str>) -> Option<Self> {
        let number = number?.trim().replace(' ', "").parse().ok()?;
        Some(Self {
            number,
            irn: irn.and_then(|irn| irn.trim().parse().ok()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claimant {
    pub person: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicare: Option<MedicareCard>,
}
diffable_object!(Claimant { person, medicare });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_contact: Option<Person>,
    pub manual_billing: bool,
}
diffable_object!(BillingInfo { customer_id, billing_contact, manual_billing });

// ── Referrals ───────────────────────────────────────────────────

/// A referral, built from an upstream patient case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub source: SourceMeta,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_appointments: Option<u32>,
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ExternalId>,
}
diffable_object!(Referral {
    source,
    name,
    referral_date,
    expiry_date,
    max_appointments,
    closed,
    contact_id,
});

impl Keyed for Referral {
    fn diff_key(&self) -> String {
        self.source.id.to_string()
    }
}

impl Referral {
    #[must_use]
    pub fn from_source(case: &CaseRecord) -> Referral {
        Referral {
            source: SourceMeta {
                id: case.id,
                created: Some(case.created_at),
                modified: Some(case.updated_at),
                archived: case.archived_at,
            },
            name: case.name.clone(),
            referral_date: case.issue_date,
            expiry_date: case.expiry_date,
            max_appointments: case.max_sessions,
            closed: case.closed,
            contact_id: case.contact.as_ref().and_then(|contact| contact.id()),
        }
    }
}

// ── Appointments ────────────────────────────────────────────────

/// An appointment attached to a patient.
///
/// `cancellation_url` and `telehealth_url` come from the attendee feed;
/// `was_invoiced` and `date_claimed` are locally owned. All four survive an
/// appointment re-sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub label: String,
    pub source: SourceMeta,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner_id: Option<ExternalId>,
    pub booked_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telehealth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_id: Option<ExternalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
    pub has_arrived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_invoiced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_claimed: Option<NaiveDate>,
}
diffable_object!(Appointment {
    label,
    source,
    start_time,
    end_time,
    practitioner_id,
    booked_online,
    cancellation_url,
    telehealth_url,
    referral_id,
    cancellation,
    has_arrived,
    was_invoiced,
    date_claimed,
});

impl Keyed for Appointment {
    fn diff_key(&self) -> String {
        self.source.id.to_string()
    }
}

impl Appointment {
    #[must_use]
    pub fn from_source(record: &AppointmentRecord, existing: Option<&Appointment>) -> Appointment {
        let cancellation = if let Some(time) = record.cancelled_at {
            Some(Cancellation {
                time: Some(time),
                kind: CancellationKind::Cancellation,
                note: non_blank(record.cancellation_note.as_deref()),
                reason: non_blank(record.cancellation_reason_description.as_deref()),
            })
        } else if record.did_not_arrive == Some(true) {
            Some(Cancellation {
                time: None,
                kind: CancellationKind::NonArrival,
                note: None,
                reason: None,
            })
        } else {
            None
        };

        Appointment {
            label: record.starts_at.format("%a %-d %b %Y %H:%M UTC").to_string(),
            source: SourceMeta {
                id: record.id,
                created: record.created_at,
                modified: record.updated_at,
                archived: record.archived_at,
            },
            start_time: record.starts_at,
            end_time: record.ends_at,
            practitioner_id: record.practitioner.id(),
            booked_online: non_blank(record.booking_ip_address.as_deref()).is_some(),
            cancellation_url: existing.and_then(|a| a.cancellation_url.clone()),
            telehealth_url: existing.and_then(|a| a.telehealth_url.clone()),
            referral_id: record.patient_case.as_ref().and_then(|case| case.id()),
            cancellation,
            has_arrived: record.patient_arrived,
            was_invoiced: existing.and_then(|a| a.was_invoiced),
            date_claimed: existing.and_then(|a| a.date_claimed),
        }
    }

    /// Copies the attendance URLs from an attendee record. Everything else on
    /// the attendee duplicates the appointment and is ignored.
    #[must_use]
    pub fn with_attendee(&self, attendee: &AttendeeRecord) -> Appointment {
        Appointment {
            cancellation_url: non_blank(attendee.cancellation_url.as_deref()),
            telehealth_url: non_blank(attendee.telehealth_url.as_deref()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationKind {
    Cancellation,
    NonArrival,
}
diffable_scalar!(CancellationKind);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub kind: CancellationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
diffable_object!(Cancellation { time, kind, note, reason });
