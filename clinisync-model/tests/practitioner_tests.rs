use clinisync_model::records::{
    AppointmentTypeRecord, PractitionerRecord, ReferenceNumberRecord, SourceRecord, UserRecord,
};
use clinisync_model::{AppointmentType, Practitioner, PractitionerKind};
use clinisync_types::ExternalId;
use pretty_assertions::assert_eq;
use serde_json::json;

fn practitioner_record(designation: &str) -> PractitionerRecord {
    serde_json::from_value(json!({
        "id": 9,
        "active": true,
        "created_at": "2023-01-01T00:00:00Z",
        "designation": designation,
        "first_name": "Alex",
        "last_name": "Doe",
        "updated_at": "2023-06-01T00:00:00Z",
        "user": { "links": { "self": "https://api.example.com/v1/users/55" } }
    }))
    .unwrap()
}

fn user_record() -> UserRecord {
    serde_json::from_value(json!({
        "id": 55,
        "created_at": "2023-01-01T00:00:00Z",
        "email": "alex@example.com",
        "phone_numbers": [{ "number": "0411 111 111", "phone_type": "Mobile" }],
        "updated_at": "2023-02-01T00:00:00Z"
    }))
    .unwrap()
}

fn reference_number(name: &str, value: Option<&str>) -> ReferenceNumberRecord {
    serde_json::from_value(json!({
        "id": 300,
        "created_at": "2023-01-01T00:00:00Z",
        "name": name,
        "practitioner": { "links": { "self": "https://api.example.com/v1/practitioners/9" } },
        "reference_number": value,
        "updated_at": "2023-01-01T00:00:00Z"
    }))
    .unwrap()
}

#[test]
fn designation_parsing_ignores_case_and_spaces() {
    assert_eq!(
        PractitionerKind::from_designation(Some("Clinical Psychologist")),
        Some(PractitionerKind::ClinicalPsychologist)
    );
    assert_eq!(
        PractitionerKind::from_designation(Some("COUNSELLOR")),
        Some(PractitionerKind::Counsellor)
    );
    assert_eq!(PractitionerKind::from_designation(Some("Dietitian")), None);
    assert_eq!(PractitionerKind::from_designation(None), None);
}

#[test]
fn from_source_links_user_from_record() {
    let p = Practitioner::from_source(&practitioner_record("Psychologist"), None);
    assert_eq!(p.label, "Alex Doe");
    assert_eq!(p.kind, Some(PractitionerKind::Psychologist));
    assert_eq!(p.user.as_ref().map(|u| u.id), Some(ExternalId::new(55)));
    assert!(p.is_active);
    assert!(!p.is_taking_intakes);
}

#[test]
fn with_user_sets_contact_details_which_survive_resync() {
    let p = Practitioner::from_source(&practitioner_record("Psychologist"), None)
        .with_user(&user_record());
    assert_eq!(p.person.email.as_deref(), Some("alex@example.com"));
    assert!(p.user.as_ref().unwrap().created.is_some());

    let mut local = p.clone();
    local.house_fee_percent = Some(30);
    local.is_taking_intakes = true;

    let resynced = Practitioner::from_source(&practitioner_record("Psychologist"), Some(&local));
    assert_eq!(resynced, local);
}

#[test]
fn reference_numbers_fill_provider_number_and_abn() {
    let p = Practitioner::from_source(&practitioner_record("Psychologist"), None);

    let p = p.with_reference_number(&reference_number("Provider #", Some("123456AB")));
    assert_eq!(p.provider_number.as_ref().unwrap().id, "123456AB");

    let p = p.with_reference_number(&reference_number("ABN", Some("51 824 753 556")));
    assert_eq!(p.abn.as_ref().unwrap().id, "51 824 753 556");

    let unchanged = p.with_reference_number(&reference_number("Other", Some("x")));
    assert_eq!(unchanged, p);
    let unchanged = p.with_reference_number(&reference_number("ABN", None));
    assert_eq!(unchanged, p);
}

#[test]
fn appointment_type_from_source() {
    let record: AppointmentTypeRecord = serde_json::from_value(json!({
        "id": 12,
        "name": "Telehealth session",
        "max_attendees": 1,
        "telehealth_enabled": true
    }))
    .unwrap();
    assert_eq!(AppointmentTypeRecord::RESOURCE, "appointment_types");
    assert_eq!(record.id(), ExternalId::new(12));

    let t = AppointmentType::from_source(&record);
    assert_eq!(t.name, "Telehealth session");
    assert!(t.is_telehealth);
    assert_eq!(t.source.id, ExternalId::new(12));
}
