use clinisync_diff::{diff, PatchOp};
use clinisync_model::records::{AppointmentRecord, AttendeeRecord, CaseRecord, PatientRecord};
use clinisync_model::{CancellationKind, Entity, Patient};
use clinisync_types::ExternalId;
use pretty_assertions::assert_eq;
use serde_json::json;

fn patient_record(last_name: &str) -> PatientRecord {
    serde_json::from_value(json!({
        "id": 1001,
        "address_1": "1 Main St",
        "address_2": "",
        "archived_at": null,
        "city": "Sydney",
        "country": "Australia",
        "created_at": "2024-01-01T00:00:00Z",
        "date_of_birth": "1990-05-17",
        "email": "sam@example.com",
        "first_name": "Samantha",
        "gender_identity": " ",
        "last_name": last_name,
        "medicare": "2123 45670",
        "medicare_reference_number": "1",
        "patient_phone_numbers": [
            { "number": "0400 000 000", "phone_type": "Mobile" },
            { "number": "", "phone_type": "Home" }
        ],
        "post_code": "2000",
        "preferred_first_name": "Sam",
        "pronouns": {
            "accusative": "them",
            "nominative": "they",
            "predicative_possessive": "their",
            "pronominal_possessive": "theirs",
            "reflexive": "themself"
        },
        "referral_source": "GP",
        "sex": null,
        "state": "NSW",
        "updated_at": "2024-02-01T00:00:00Z",
        "unknown_field": true
    }))
    .unwrap()
}

fn case_record(id: u64, name: &str) -> CaseRecord {
    serde_json::from_value(json!({
        "id": id,
        "archived_at": null,
        "created_at": "2024-01-05T00:00:00Z",
        "updated_at": "2024-01-05T00:00:00Z",
        "closed": false,
        "contact": { "links": { "self": "https://api.example.com/v1/contacts/77" } },
        "expiry_date": "2025-01-05",
        "issue_date": "2024-01-05",
        "max_sessions": 10,
        "name": name,
        "patient": { "links": { "self": "https://api.example.com/v1/patients/1001" } }
    }))
    .unwrap()
}

fn appointment_record(id: u64, arrived: bool) -> AppointmentRecord {
    serde_json::from_value(json!({
        "id": id,
        "archived_at": null,
        "booking_ip_address": "10.0.0.1",
        "cancellation_note": null,
        "cancellation_reason_description": null,
        "cancelled_at": null,
        "created_at": "2024-03-01T00:00:00Z",
        "did_not_arrive": false,
        "ends_at": "2024-03-04T23:50:00Z",
        "patient": { "links": { "self": "https://api.example.com/v1/patients/1001" } },
        "patient_arrived": arrived,
        "patient_case": { "links": { "self": "https://api.example.com/v1/patient_cases/5" } },
        "practitioner": { "links": { "self": "https://api.example.com/v1/practitioners/9" } },
        "starts_at": "2024-03-04T23:00:00Z",
        "updated_at": "2024-03-01T00:00:00Z"
    }))
    .unwrap()
}

fn attendee_record(booking: u64) -> AttendeeRecord {
    serde_json::from_value(json!({
        "id": 3,
        "booking": { "links": { "self": format!("https://api.example.com/v1/bookings/{booking}") } },
        "cancellation_url": "https://example.com/cancel/abc",
        "patient": { "links": { "self": "https://api.example.com/v1/patients/1001" } },
        "telehealth_url": "https://example.com/video/abc"
    }))
    .unwrap()
}

// ── Conversion ───────────────────────────────────────────────────

#[test]
fn from_source_maps_fields() {
    let p = Patient::from_source(&patient_record("Smith"), None);

    assert_eq!(p.external_id(), ExternalId::new(1001));
    assert_eq!(p.label, "Sam Smith");
    assert_eq!(p.person.name.preferred.as_deref(), Some("Sam"));
    assert_eq!(p.person.gender, None);
    assert_eq!(p.person.pronouns.as_ref().unwrap().they, "they");

    let address = p.person.address.as_ref().unwrap();
    assert_eq!(address.line1.as_deref(), Some("1 Main St"));
    assert_eq!(address.line2, None);
    assert_eq!(address.post_code, Some(2000));

    let phones = p.person.phones.as_ref().unwrap();
    assert_eq!(phones.len(), 1);
    assert_eq!(phones.get("0400 000 000").map(String::as_str), Some("Mobile"));

    let medicare = p.medicare.as_ref().unwrap();
    assert_eq!(medicare.number, 212_345_670);
    assert_eq!(medicare.irn, Some(1));
    assert_eq!(p.marketing_source.as_deref(), Some("GP"));
    assert!(p.referrals.is_empty());
    assert!(p.appointments.is_empty());
}

#[test]
fn from_source_keeps_locally_owned_fields() {
    let mut existing = Patient::from_source(&patient_record("Smith"), None);
    existing.note = Some("VIP".into());
    existing.ndis_number = Some(430_000_000);
    existing = existing.with_case(&case_record(5, "Mental health plan"));

    let updated = Patient::from_source(&patient_record("Jones"), Some(&existing));
    assert_eq!(updated.note.as_deref(), Some("VIP"));
    assert_eq!(updated.ndis_number, Some(430_000_000));
    assert_eq!(updated.referrals.len(), 1);

    let patch = diff(Some(&existing), Some(&updated)).unwrap();
    assert_eq!(patch.get("person.name.last"), Some(&PatchOp::Set(json!("Jones"))));
    assert_eq!(patch.get("label"), Some(&PatchOp::Set(json!("Sam Jones"))));
    assert!(!patch.paths().any(|path| path.starts_with("note")));
    assert_eq!(patch.len(), 2);
}

#[test]
fn stored_document_round_trips() {
    let p = Patient::from_source(&patient_record("Smith"), None)
        .with_appointment(&appointment_record(40, false));
    let stored = serde_json::to_value(&p).unwrap();
    let loaded: Patient = serde_json::from_value(stored).unwrap();
    assert_eq!(loaded, p);
}

// ── Referrals ────────────────────────────────────────────────────

#[test]
fn with_case_adds_then_replaces_referral() {
    let p = Patient::from_source(&patient_record("Smith"), None);
    let p = p.with_case(&case_record(5, "First"));
    let p = p.with_case(&case_record(6, "Second"));
    let p = p.with_case(&case_record(5, "First (renewed)"));

    assert_eq!(p.referrals.len(), 2);
    assert_eq!(p.referrals[0].name, "First (renewed)");
    assert_eq!(p.referrals[0].contact_id, Some(ExternalId::new(77)));
    assert_eq!(p.referrals[0].max_appointments, Some(10));
    assert_eq!(p.referrals[1].name, "Second");
}

// ── Appointments ─────────────────────────────────────────────────

#[test]
fn with_appointment_maps_and_appends() {
    let p = Patient::from_source(&patient_record("Smith"), None)
        .with_appointment(&appointment_record(40, false));

    let appt = &p.appointments[0];
    assert_eq!(appt.label, "Mon 4 Mar 2024 23:00 UTC");
    assert_eq!(appt.practitioner_id, Some(ExternalId::new(9)));
    assert_eq!(appt.referral_id, Some(ExternalId::new(5)));
    assert!(appt.booked_online);
    assert!(appt.cancellation.is_none());
    assert!(p.has_appointment(ExternalId::new(40)));
}

#[test]
fn cancelled_and_non_arrival_appointments() {
    let mut cancelled = appointment_record(41, false);
    cancelled.cancelled_at = Some("2024-03-02T00:00:00Z".parse().unwrap());
    cancelled.cancellation_note = Some("sick".into());
    let mut no_show = appointment_record(42, false);
    no_show.did_not_arrive = Some(true);

    let p = Patient::from_source(&patient_record("Smith"), None)
        .with_appointment(&cancelled)
        .with_appointment(&no_show);

    let c = p.appointments[0].cancellation.as_ref().unwrap();
    assert_eq!(c.kind, CancellationKind::Cancellation);
    assert_eq!(c.note.as_deref(), Some("sick"));
    let n = p.appointments[1].cancellation.as_ref().unwrap();
    assert_eq!(n.kind, CancellationKind::NonArrival);
    assert_eq!(n.time, None);
}

#[test]
fn appointment_resync_keeps_attendee_and_local_fields() {
    let mut p = Patient::from_source(&patient_record("Smith"), None)
        .with_appointment(&appointment_record(40, false))
        .with_attendee(&attendee_record(40), ExternalId::new(40))
        .unwrap();
    p.appointments[0].was_invoiced = Some(true);

    let updated = p.with_appointment(&appointment_record(40, true));
    let appt = &updated.appointments[0];
    assert!(appt.has_arrived);
    assert_eq!(appt.was_invoiced, Some(true));
    assert_eq!(appt.cancellation_url.as_deref(), Some("https://example.com/cancel/abc"));
    assert_eq!(appt.telehealth_url.as_deref(), Some("https://example.com/video/abc"));

    let patch = diff(Some(&p), Some(&updated)).unwrap();
    assert_eq!(patch.paths().collect::<Vec<_>>(), vec!["appointments.0.has_arrived"]);
}

#[test]
fn attendee_requires_existing_appointment() {
    let p = Patient::from_source(&patient_record("Smith"), None);
    assert!(p.with_attendee(&attendee_record(40), ExternalId::new(40)).is_none());
}

#[test]
fn new_appointment_diff_appends_whole_element() {
    let p = Patient::from_source(&patient_record("Smith"), None)
        .with_appointment(&appointment_record(40, false));
    let updated = p.with_appointment(&appointment_record(41, false));

    let patch = diff(Some(&p), Some(&updated)).unwrap();
    assert_eq!(patch.paths().collect::<Vec<_>>(), vec!["appointments.1"]);
}
