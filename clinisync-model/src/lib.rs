//! Entity model for clinisync.
//!
//! Two families of types live here:
//! - **Stored entities** ([`Patient`], [`Practitioner`], [`AppointmentType`])
//!   are the documents kept in the local store. Each implements [`Entity`]
//!   and [`clinisync_diff::Diffable`], and separates source-owned fields
//!   (rebuilt from upstream on every sync) from locally-owned fields (copied
//!   forward from the existing document).
//! - **Wire records** ([`records`]) mirror the upstream REST payloads and are
//!   only ever deserialized.
//!
//! Combination functions (`from_source`, `with_case`, `with_user`, ...) turn a
//! wire record plus the existing entity into the updated entity.

mod appointment_type;
mod entity;
mod metadata;
mod patient;
mod practitioner;
pub mod records;
mod shared;

pub use appointment_type::AppointmentType;
pub use entity::Entity;
pub use metadata::SyncMetadata;
pub use patient::{
    Appointment, BillingInfo, Cancellation, CancellationKind, Claimant, MedicareCard, Patient,
    Referral,
};
pub use practitioner::{Practitioner, PractitionerKind, PractitionerNumber};
pub use shared::{phones_from_source, Address, Name, Person, Pronouns, SourceMeta};

/// Replaces the element matching `matches` with `build(Some(old))`, or
/// appends `build(None)` when nothing matches.
pub(crate) fn upsert_by<T: Clone>(
    items: &[T],
    matches: impl Fn(&T) -> bool,
    build: impl FnOnce(Option<&T>) -> T,
) -> Vec<T> {
    let mut updated = items.to_vec();
    match updated.iter().position(|item| matches(item)) {
        Some(index) => {
            let replacement = build(Some(&updated[index]));
            updated[index] = replacement;
        }
        None => updated.push(build(None)),
    }
    updated
}

/// Trims a string and maps blank values to `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
