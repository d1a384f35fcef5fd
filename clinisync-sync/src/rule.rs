//! How an upstream record is merged into a stored entity.

use crate::pending::Dependency;
use crate::SyncResult;
use clinisync_model::records::SourceRecord;
use clinisync_model::{AppointmentType, Entity, Patient, Practitioner};
use clinisync_source::Query;
use clinisync_types::ExternalId;

/// Result of combining a record with the stored entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Combined<E> {
    /// The updated entity.
    Entity(E),
    /// The entity exists but lacks a part the record attaches to.
    MissingDependency(Dependency),
}

/// An entity whose presence can release waiting records.
pub trait SyncEntity: Entity {
    /// Dependencies this entity satisfies once stored.
    fn satisfies(&self) -> Vec<Dependency>;
}

impl SyncEntity for Patient {
    fn satisfies(&self) -> Vec<Dependency> {
        std::iter::once(Dependency::patient(self.source.id))
            .chain(
                self.appointments
                    .iter()
                    .map(|appointment| Dependency::appointment(appointment.source.id)),
            )
            .collect()
    }
}

impl SyncEntity for Practitioner {
    fn satisfies(&self) -> Vec<Dependency> {
        std::iter::once(Dependency::practitioner(self.source.id))
            .chain(self.user.as_ref().map(|user| Dependency::user(user.id)))
            .collect()
    }
}

impl SyncEntity for AppointmentType {
    fn satisfies(&self) -> Vec<Dependency> {
        vec![Dependency::appointment_type(self.source.id)]
    }
}

/// Merge behaviour for one upstream resource.
///
/// The orchestrator looks up the stored entity whose `lookup_field` equals
/// `lookup_key(record)`. When none exists and `allow_create` is false the
/// record is skipped with [`missing`](MergeRule::missing); otherwise
/// `combine` builds the updated entity.
pub trait MergeRule: Clone + Send + Sync + 'static {
    type Record: SourceRecord + Clone;
    type Entity: SyncEntity;

    /// Upstream resource name, used for fetching and in logs.
    fn name(&self) -> &'static str {
        Self::Record::RESOURCE
    }

    /// Filters sent with every fetch of this resource.
    fn query(&self) -> Query {
        Query::new()
    }

    /// Stored field holding the lookup key.
    fn lookup_field(&self) -> &'static str;

    /// External id of the entity this record merges into.
    fn lookup_key(&self, record: &Self::Record) -> SyncResult<ExternalId>;

    fn record_id(&self, record: &Self::Record) -> ExternalId {
        record.id()
    }

    /// Whether a record may create its entity.
    fn allow_create(&self) -> bool;

    /// Dependency reported when no entity matches `key`.
    fn missing(&self, key: ExternalId) -> Dependency;

    /// Builds the updated entity from the record and the stored one.
    fn combine(
        &self,
        record: &Self::Record,
        existing: Option<&Self::Entity>,
    ) -> SyncResult<Combined<Self::Entity>>;
}
