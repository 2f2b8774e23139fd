// src/cache.rs

//! Name-keyed package cache with insertion-order iteration

use crate::db::models::Package;
use std::collections::HashMap;

/// The authoritative set of records, at most one per package name
///
/// Iteration follows the order in which names first entered the cache.
/// Replacing a record keeps its position; removing it forgets the position.
#[derive(Debug, Default, Clone)]
pub struct PackageCache {
    packages: HashMap<String, Package>,
    order: Vec<String>,
}

impl PackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache sized for an expected number of records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            packages: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Insert a record, handing back the one it displaced
    ///
    /// A displaced record's iteration slot is taken over by the new one.
    pub fn insert(&mut self, pkg: Package) -> Option<Package> {
        let name = pkg.name.clone();
        let previous = self.packages.insert(name.clone(), pkg);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    /// Detach and return the record stored under `name`
    pub fn remove(&mut self, name: &str) -> Option<Package> {
        let removed = self.packages.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.order.iter().filter_map(|name| self.packages.get(name))
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Consume the cache, yielding records in insertion order
    pub fn into_packages(mut self) -> Vec<Package> {
        self.order
            .iter()
            .filter_map(|name| self.packages.remove(name))
            .collect()
    }
}
