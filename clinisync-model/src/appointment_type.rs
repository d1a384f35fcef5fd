use crate::records::AppointmentTypeRecord;
use crate::shared::SourceMeta;
use crate::Entity;
use clinisync_diff::diffable_object;
use clinisync_types::ExternalId;
use serde::{Deserialize, Serialize};

/// An appointment type document. Every field is source-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentType {
    pub source: SourceMeta,
    pub name: String,
    pub is_telehealth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<u32>,
}
diffable_object!(AppointmentType { source, name, is_telehealth, max_attendees });

impl Entity for AppointmentType {
    const COLLECTION: &'static str = "appointment_types";

    fn external_id(&self) -> ExternalId {
        self.source.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl AppointmentType {
    #[must_use]
    pub fn from_source(record: &AppointmentTypeRecord) -> AppointmentType {
        AppointmentType {
            source: SourceMeta::with_id(record.id),
            name: record.name.clone(),
            is_telehealth: record.telehealth_enabled,
            max_attendees: record.max_attendees,
        }
    }
}
