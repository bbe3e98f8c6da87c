//! In-memory component registry, keyed by component id.
//!
//! Every mutating call that can be undone returns a [`Compensation`]
//! describing exactly what it overwrote. Applying a compensation restores
//! only the keys the original mutation touched, so later edits to other
//! keys of the same component survive a rollback.

use std::collections::HashMap;

use serde_json::Value;

use crate::component::{ComponentRecord, Map};
use crate::error::{ComponentError, ComponentResult};

/// Which mapping of a component a patch applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// The `props` mapping.
    Props,
    /// The `events` mapping.
    Events,
}

/// Undo record for one registry mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Put back the previous value of each touched key (`None` = key was absent).
    Restore {
        /// Target component.
        component_id: String,
        /// Mapping the patch was merged into.
        section: Section,
        /// Previous values in patch order.
        previous: Vec<(String, Option<Value>)>,
    },
    /// Undo an insert: drop the id, or reinstate the record it replaced.
    Uninsert {
        /// Inserted component id.
        component_id: String,
        /// Record that occupied the id before the insert.
        replaced: Option<Box<ComponentRecord>>,
    },
    /// Undo a removal.
    Reinsert {
        /// The removed record.
        record: Box<ComponentRecord>,
    },
}

impl Compensation {
    /// Id of the component this compensation targets.
    pub fn component_id(&self) -> &str {
        match self {
            Compensation::Restore { component_id, .. } => component_id,
            Compensation::Uninsert { component_id, .. } => component_id,
            Compensation::Reinsert { record } => &record.id,
        }
    }
}

/// Mutable store of server-known components.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, ComponentRecord>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component, replacing any record with the same id.
    pub fn insert(&mut self, record: ComponentRecord) -> Option<ComponentRecord> {
        log::debug!("registering component {} ({})", record.id, record.component_type);
        self.components.insert(record.id.clone(), record)
    }

    /// Validate a component tree and insert it, returning its undo record.
    pub fn create(&mut self, record: ComponentRecord) -> ComponentResult<Compensation> {
        record.validate_tree()?;
        let component_id = record.id.clone();
        let replaced = self.insert(record).map(Box::new);
        Ok(Compensation::Uninsert {
            component_id,
            replaced,
        })
    }

    /// Shallow-merge `patch` into the component's props.
    pub fn update(&mut self, id: &str, patch: &Map) -> ComponentResult<Compensation> {
        self.merge(id, Section::Props, patch)
    }

    /// Merge `events` into the component's event bindings.
    pub fn bind_events(&mut self, id: &str, events: &Map) -> ComponentResult<Compensation> {
        self.merge(id, Section::Events, events)
    }

    fn merge(&mut self, id: &str, section: Section, patch: &Map) -> ComponentResult<Compensation> {
        let record = self
            .components
            .get_mut(id)
            .ok_or_else(|| ComponentError::NotFound(id.to_string()))?;

        let target = match section {
            Section::Props => &mut record.props,
            Section::Events => &mut record.events,
        };

        let previous = patch
            .iter()
            .map(|(key, value)| (key.clone(), target.insert(key.clone(), value.clone())))
            .collect();

        Ok(Compensation::Restore {
            component_id: id.to_string(),
            section,
            previous,
        })
    }

    /// Delete a component.
    pub fn remove(&mut self, id: &str) -> ComponentResult<ComponentRecord> {
        let removed = self
            .components
            .remove(id)
            .ok_or_else(|| ComponentError::NotFound(id.to_string()))?;
        log::debug!("removed component {id}");
        Ok(removed)
    }

    /// Apply an undo record produced by an earlier mutation.
    pub fn compensate(&mut self, compensation: Compensation) -> ComponentResult<()> {
        match compensation {
            Compensation::Restore {
                component_id,
                section,
                previous,
            } => {
                let record = self
                    .components
                    .get_mut(&component_id)
                    .ok_or(ComponentError::NotFound(component_id))?;
                let target = match section {
                    Section::Props => &mut record.props,
                    Section::Events => &mut record.events,
                };
                // Reverse order so a key patched twice ends at its oldest value.
                for (key, value) in previous.into_iter().rev() {
                    match value {
                        Some(value) => {
                            target.insert(key, value);
                        }
                        None => {
                            target.remove(&key);
                        }
                    }
                }
            }
            Compensation::Uninsert {
                component_id,
                replaced,
            } => match replaced {
                Some(record) => {
                    self.components.insert(component_id, *record);
                }
                None => {
                    self.components.remove(&component_id);
                }
            },
            Compensation::Reinsert { record } => {
                self.components.insert(record.id.clone(), *record);
            }
        }
        Ok(())
    }

    /// Look up a component.
    pub fn get(&self, id: &str) -> Option<&ComponentRecord> {
        self.components.get(id)
    }

    /// Whether a component with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// All component ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.components.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Clone of every record, sorted by id.
    pub fn snapshot(&self) -> Vec<ComponentRecord> {
        let mut records: Vec<ComponentRecord> = self.components.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}
