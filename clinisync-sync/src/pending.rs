//! Records waiting for a parent entity.
//!
//! Upstream feeds arrive in any order, so a child record (an appointment,
//! a user account) is often merged before its parent exists. Instead of
//! dropping it and waiting for the next full pass, the engine parks it here
//! under the [`Dependency`] it is missing and retries it as soon as a merge
//! produces that parent.

use clinisync_types::ExternalId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// What a missing parent is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// A patient, by upstream patient id.
    Patient,
    /// A patient holding an appointment, by upstream appointment id.
    Appointment,
    /// A practitioner, by upstream practitioner id.
    Practitioner,
    /// A practitioner linked to a user account, by upstream user id.
    User,
    /// An appointment type, by upstream id.
    AppointmentType,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependencyKind::Patient => "patient",
            DependencyKind::Appointment => "appointment",
            DependencyKind::Practitioner => "practitioner",
            DependencyKind::User => "user",
            DependencyKind::AppointmentType => "appointment type",
        };
        f.write_str(name)
    }
}

/// A parent entity that must exist before a record can be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub id: ExternalId,
}

impl Dependency {
    pub fn new(kind: DependencyKind, id: ExternalId) -> Self {
        Self { kind, id }
    }

    pub fn patient(id: ExternalId) -> Self {
        Self::new(DependencyKind::Patient, id)
    }

    pub fn appointment(id: ExternalId) -> Self {
        Self::new(DependencyKind::Appointment, id)
    }

    pub fn practitioner(id: ExternalId) -> Self {
        Self::new(DependencyKind::Practitioner, id)
    }

    pub fn user(id: ExternalId) -> Self {
        Self::new(DependencyKind::User, id)
    }

    pub fn appointment_type(id: ExternalId) -> Self {
        Self::new(DependencyKind::AppointmentType, id)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Identity of a queued item. Deferring an item with the same identity
/// replaces the earlier one.
pub trait Pending {
    fn pending_key(&self) -> (&'static str, ExternalId);
}

/// Items parked by the dependency they wait for.
#[derive(Debug)]
pub struct PendingQueue<T> {
    waiting: BTreeMap<Dependency, Vec<T>>,
    index: HashMap<(&'static str, ExternalId), Dependency>,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self {
            waiting: BTreeMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Pending> PendingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `item` until `dependency` is released.
    pub fn defer(&mut self, dependency: Dependency, item: T) {
        let key = item.pending_key();
        if let Some(previous) = self.index.insert(key, dependency) {
            if let Some(items) = self.waiting.get_mut(&previous) {
                items.retain(|queued| queued.pending_key() != key);
                if items.is_empty() {
                    self.waiting.remove(&previous);
                }
            }
        }
        self.waiting.entry(dependency).or_default().push(item);
    }

    /// Removes and returns everything waiting for `dependency`.
    pub fn release(&mut self, dependency: &Dependency) -> Vec<T> {
        let items = self.waiting.remove(dependency).unwrap_or_default();
        for item in &items {
            self.index.remove(&item.pending_key());
        }
        items
    }

    /// Removes and returns every queued item.
    pub fn drain(&mut self) -> Vec<T> {
        self.index.clear();
        std::mem::take(&mut self.waiting)
            .into_values()
            .flatten()
            .collect()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every queued item, grouped by dependency.
    pub fn iter(&self) -> impl Iterator<Item = (&Dependency, &T)> {
        self.waiting
            .iter()
            .flat_map(|(dependency, items)| items.iter().map(move |item| (dependency, item)))
    }

    /// Dependencies that have at least one item waiting.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.waiting.keys()
    }

    pub fn is_waiting_for(&self, dependency: &Dependency) -> bool {
        self.waiting.contains_key(dependency)
    }
}
