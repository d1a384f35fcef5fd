use crate::records::{PractitionerRecord, ReferenceNumberRecord, UserRecord};
use crate::shared::{phones_from_source, Name, Person, SourceMeta};
use crate::{non_blank, Entity};
use clinisync_diff::{diffable_object, diffable_scalar};
use clinisync_types::ExternalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A practitioner document.
///
/// The user account, contact details and reference numbers arrive through
/// separate feeds. Billing, payment and intake settings are locally owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PractitionerKind>,
    pub source: SourceMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SourceMeta>,
    pub person: Person,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_number: Option<PractitionerNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abn: Option<PractitionerNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_fee_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xero_contact_id: Option<String>,
    #[serde(default)]
    pub is_taking_intakes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letters_folder_id: Option<String>,
    /// Letter type → template document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_templates: Option<BTreeMap<String, String>>,
}
diffable_object!(Practitioner {
    label,
    kind,
    source,
    user,
    person,
    is_active,
    provider_number,
    abn,
    house_fee_percent,
    stripe_account,
    xero_contact_id,
    is_taking_intakes,
    letters_folder_id,
    letter_templates,
});

impl Entity for Practitioner {
    const COLLECTION: &'static str = "practitioners";

    fn external_id(&self) -> ExternalId {
        self.source.id
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Practitioner {
    /// Builds a practitioner from its upstream record, keeping user, contact
    /// details, reference numbers and local settings from `existing`.
    #[must_use]
    pub fn from_source(record: &PractitionerRecord, existing: Option<&Practitioner>) -> Practitioner {
        let name = Name {
            first: record.first_name.clone().unwrap_or_default(),
            preferred: None,
            last: record.last_name.clone().unwrap_or_default(),
        };

        // Link the user from the record only until the user feed fills it in.
        let user = existing.and_then(|p| p.user.clone()).or_else(|| {
            record
                .user
                .as_ref()
                .and_then(|link| link.id())
                .map(SourceMeta::with_id)
        });

        let mut person = Person::named(name.clone());
        person.email = existing.and_then(|p| p.person.email.clone());
        person.phones = existing.and_then(|p| p.person.phones.clone());

        Practitioner {
            label: name.full(false),
            kind: PractitionerKind::from_designation(record.designation.as_deref()),
            source: SourceMeta {
                id: record.id,
                created: Some(record.created_at),
                modified: Some(record.updated_at),
                archived: None,
            },
            user,
            person,
            is_active: record.active == Some(true),
            provider_number: existing.and_then(|p| p.provider_number.clone()),
            abn: existing.and_then(|p| p.abn.clone()),
            house_fee_percent: existing.and_then(|p| p.house_fee_percent),
            stripe_account: existing.and_then(|p| p.stripe_account.clone()),
            xero_contact_id: existing.and_then(|p| p.xero_contact_id.clone()),
            is_taking_intakes: existing.is_some_and(|p| p.is_taking_intakes),
            letters_folder_id: existing.and_then(|p| p.letters_folder_id.clone()),
            letter_templates: existing.and_then(|p| p.letter_templates.clone()),
        }
    }

    /// Returns a copy with the user account and contact details of `user`.
    #[must_use]
    pub fn with_user(&self, user: &UserRecord) -> Practitioner {
        let mut person = self.person.clone();
        person.email = non_blank(Some(&user.email));
        person.phones = Some(phones_from_source(
            user.phone_numbers.as_deref().unwrap_or_default(),
        ));

        Practitioner {
            user: Some(SourceMeta {
                id: user.id,
                created: Some(user.created_at),
                modified: Some(user.updated_at),
                archived: None,
            }),
            person,
            ..self.clone()
        }
    }

    /// Returns a copy with the provider number or ABN from `number`.
    /// Other kinds of reference number leave the practitioner unchanged.
    #[must_use]
    pub fn with_reference_number(&self, number: &ReferenceNumberRecord) -> Practitioner {
        let Some(value) = non_blank(number.reference_number.as_deref()) else {
            return self.clone();
        };
        let description = number.name.clone().unwrap_or_default();
        let practitioner_number = PractitionerNumber {
            id: value,
            description: description.clone(),
            source: SourceMeta {
                id: number.id,
                created: Some(number.created_at),
                modified: Some(number.updated_at),
                archived: None,
            },
        };

        match description.as_str() {
            PractitionerNumber::PROVIDER => Practitioner {
                provider_number: Some(practitioner_number),
                ..self.clone()
            },
            PractitionerNumber::ABN => Practitioner {
                abn: Some(practitioner_number),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PractitionerNumber {
    pub id: String,
    pub description: String,
    pub source: SourceMeta,
}
diffable_object!(PractitionerNumber { id, description, source });

impl PractitionerNumber {
    /// Upstream name of a Medicare provider number.
    pub const PROVIDER: &'static str = "Provider #";
    /// Upstream name of an Australian Business Number.
    pub const ABN: &'static str = "ABN";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PractitionerKind {
    Psychologist,
    ClinicalPsychologist,
    Counsellor,
}
diffable_scalar!(PractitionerKind);

impl PractitionerKind {
    /// Parses an upstream designation, ignoring case and spaces.
    #[must_use]
    pub fn from_designation(designation: Option<&str>) -> Option<Self> {
        let normalized: String = designation?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "psychologist" => Some(Self::Psychologist),
            "clinicalpsychologist" => Some(Self::ClinicalPsychologist),
            "counsellor" => Some(Self::Counsellor),
            _ => None,
        }
    }
}
