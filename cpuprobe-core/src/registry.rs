//! Workload registry.
//!
//! Write-once at startup, read-only while a run is measuring. Iteration order
//! is registration order.

use std::collections::HashMap;

use crate::config::WorkloadOptions;
use crate::error::{HarnessError, HarnessResult};
use crate::filter::WorkloadFilter;
use crate::types::WorkloadName;
use crate::workload::Workload;

/// Entry in the workload registry.
pub struct WorkloadEntry {
    /// Unique workload name.
    pub name: WorkloadName,
    /// Options given at registration.
    pub options: WorkloadOptions,
    /// The workload itself.
    pub workload: Box<dyn Workload>,
}

/// Ordered registry of named workloads.
#[derive(Default)]
pub struct WorkloadRegistry {
    entries: Vec<WorkloadEntry>,
    index: HashMap<WorkloadName, usize>,
}

impl WorkloadRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new workload.
    /// Fails on duplicate names and leaves the existing entry untouched.
    pub fn register(
        &mut self,
        name: WorkloadName,
        workload: Box<dyn Workload>,
        options: WorkloadOptions,
    ) -> HarnessResult<()> {
        if self.index.contains_key(&name) {
            return Err(HarnessError::DuplicateName(name));
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(WorkloadEntry {
            name,
            options,
            workload,
        });

        Ok(())
    }

    /// Check if a workload exists.
    pub fn contains(&self, name: &WorkloadName) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &WorkloadName) -> Option<&WorkloadEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Get the number of registered workloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &WorkloadName> {
        self.entries.iter().map(|e| &e.name)
    }

    /// Entries selected by `filter`, in registration order.
    pub fn select_mut<'a>(
        &'a mut self,
        filter: &'a WorkloadFilter,
    ) -> impl Iterator<Item = &'a mut WorkloadEntry> + 'a {
        self.entries
            .iter_mut()
            .filter(move |e| filter.matches(e.name.as_str()))
    }

    /// Number of entries selected by `filter`.
    pub fn count_matching(&self, filter: &WorkloadFilter) -> usize {
        self.entries
            .iter()
            .filter(|e| filter.matches(e.name.as_str()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::from_fn;

    fn name(s: &str) -> WorkloadName {
        WorkloadName::new(s).unwrap()
    }

    fn constant(value: u64) -> Box<dyn Workload> {
        Box::new(from_fn(move |_| Ok(value)))
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = WorkloadRegistry::new();
        registry
            .register(name("sum"), constant(1), WorkloadOptions::new())
            .unwrap();

        assert!(registry.contains(&name("sum")));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let mut registry = WorkloadRegistry::new();
        registry
            .register(name("sum"), constant(1), WorkloadOptions::new().iterations(5))
            .unwrap();

        let result = registry.register(name("sum"), constant(2), WorkloadOptions::new());
        assert!(matches!(result, Err(HarnessError::DuplicateName(_))));

        assert_eq!(registry.len(), 1);
        let entry = registry.get(&name("sum")).unwrap();
        assert_eq!(entry.options, WorkloadOptions::new().iterations(5));
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = WorkloadRegistry::new();
        for n in ["zeta", "alpha", "mid"] {
            registry
                .register(name(n), constant(0), WorkloadOptions::new())
                .unwrap();
        }
        let names: Vec<_> = registry.names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_select_by_filter() {
        let mut registry = WorkloadRegistry::new();
        for n in ["sum_stride2", "sum_stride4", "vector_add"] {
            registry
                .register(name(n), constant(0), WorkloadOptions::new())
                .unwrap();
        }

        let filter = WorkloadFilter::substring("stride");
        assert_eq!(registry.count_matching(&filter), 2);
        let selected: Vec<_> = registry
            .select_mut(&filter)
            .map(|e| e.name.to_string())
            .collect();
        assert_eq!(selected, vec!["sum_stride2", "sum_stride4"]);
    }
}
