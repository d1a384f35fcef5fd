//! Value types shared by several entities.

use crate::non_blank;
use crate::records::{PhoneNumber, PronounsRecord};
use chrono::{DateTime, NaiveDate, Utc};
use clinisync_diff::diffable_object;
use clinisync_types::ExternalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub first: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
    pub last: String,
}
diffable_object!(Name { first, preferred, last });

impl Name {
    /// Full name, using the preferred first name when one is set.
    #[must_use]
    pub fn full(&self, use_preferred: bool) -> String {
        match self.preferred.as_deref() {
            Some(preferred) if use_preferred && !preferred.trim().is_empty() => {
                format!("{} {}", preferred, self.last)
            }
            _ => format!("{} {}", self.first, self.last),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}
diffable_object!(Address { line1, line2, line3, post_code, city, state, country });

impl Address {
    /// Returns `None` when every part is missing.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        (self != Self::default()).then_some(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pronouns {
    pub they: String,
    pub them: String,
    pub their: String,
    pub theirs: String,
    pub themself: String,
}
diffable_object!(Pronouns { they, them, their, theirs, themself });

impl From<&PronounsRecord> for Pronouns {
    fn from(record: &PronounsRecord) -> Self {
        Self {
            they: record.nominative.clone(),
            them: record.accusative.clone(),
            their: record.predicative_possessive.clone(),
            theirs: record.pronominal_possessive.clone(),
            themself: record.reflexive.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronouns: Option<Pronouns>,
    /// Phone number → phone type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<BTreeMap<String, String>>,
}
diffable_object!(Person { name, dob, email, address, gender, sex, pronouns, phones });

impl Person {
    /// A person with only a name.
    #[must_use]
    pub fn named(name: Name) -> Self {
        Self {
            name,
            dob: None,
            email: None,
            address: None,
            gender: None,
            sex: None,
            pronouns: None,
            phones: None,
        }
    }
}

/// Identity and timestamps of the upstream record an entity or list element
/// was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub id: ExternalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<DateTime<Utc>>,
}
diffable_object!(SourceMeta { id, created, modified, archived });

impl SourceMeta {
    /// Metadata carrying only the upstream id.
    #[must_use]
    pub fn with_id(id: ExternalId) -> Self {
        Self {
            id,
            created: None,
            modified: None,
            archived: None,
        }
    }
}

/// Builds the number → type map stored on a [`Person`].
///
/// Blank numbers are dropped. `.` separates store paths, so it is replaced
/// with a space in the number used as the key.
#[must_use]
pub fn phones_from_source(numbers: &[PhoneNumber]) -> BTreeMap<String, String> {
    numbers
        .iter()
        .filter_map(|phone| {
            let number = non_blank(Some(&phone.number))?.replace('.', " ");
            Some((number, phone.phone_type.clone()))
        })
        .collect()
}
