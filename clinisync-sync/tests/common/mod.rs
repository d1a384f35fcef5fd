//! Shared upstream record fixtures for sync tests.

#![allow(dead_code)]

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub const API: &str = "https://api.example.com/v1";

pub fn link(resource: &str, id: u64) -> Value {
    json!({ "links": { "self": format!("{API}/{resource}/{id}") } })
}

pub fn patient_json(id: u64, last_name: &str) -> Value {
    json!({
        "id": id,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-02-01T00:00:00Z",
        "first_name": "Sam",
        "last_name": last_name,
        "email": "sam@example.com",
        "patient_phone_numbers": [{ "number": "0400 000 000", "phone_type": "Mobile" }]
    })
}

pub fn case_json(id: u64, patient: u64) -> Value {
    json!({
        "id": id,
        "created_at": "2024-01-05T00:00:00Z",
        "updated_at": "2024-01-05T00:00:00Z",
        "closed": false,
        "name": "Knee rehab",
        "patient": link("patients", patient)
    })
}

pub fn appointment_json(id: u64, patient: u64) -> Value {
    json!({
        "id": id,
        "created_at": "2024-03-01T00:00:00Z",
        "updated_at": "2024-03-01T00:00:00Z",
        "starts_at": "2024-03-04T23:00:00Z",
        "ends_at": "2024-03-04T23:50:00Z",
        "patient": link("patients", patient),
        "practitioner": link("practitioners", 9),
        "patient_arrived": false
    })
}

pub fn attendee_json(id: u64, booking: Value, patient: u64) -> Value {
    json!({
        "id": id,
        "booking": booking,
        "patient": link("patients", patient),
        "telehealth_url": "https://video.example.com/room/1"
    })
}

pub fn appointment_type_json(id: u64, name: &str) -> Value {
    json!({ "id": id, "name": name, "telehealth_enabled": true, "max_attendees": 1 })
}

pub fn practitioner_json(id: u64, user: u64) -> Value {
    json!({
        "id": id,
        "active": true,
        "created_at": "2023-01-01T00:00:00Z",
        "updated_at": "2023-06-01T00:00:00Z",
        "designation": "Physiotherapist",
        "first_name": "Alex",
        "last_name": "Doe",
        "user": link("users", user)
    })
}

pub fn user_json(id: u64) -> Value {
    json!({
        "id": id,
        "created_at": "2023-01-01T00:00:00Z",
        "updated_at": "2023-02-01T00:00:00Z",
        "email": "alex@example.com"
    })
}

pub fn reference_number_json(id: u64, practitioner: u64) -> Value {
    json!({
        "id": id,
        "created_at": "2023-01-01T00:00:00Z",
        "updated_at": "2023-01-01T00:00:00Z",
        "name": "Provider #",
        "practitioner": link("practitioners", practitioner),
        "reference_number": "2426577L"
    })
}

pub fn record<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}
