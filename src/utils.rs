/*!
Small collection helpers used across the round engine and the families built
on it.

Ported from `manul::utils::traits`.
*/

use alloc::collections::{BTreeMap, BTreeSet};

use crate::{
    error::LocalError,
    protocol::{Artifact, Payload},
};

/// Implemented by collections allowing removal of a specific item.
pub trait Without<T> {
    fn without(self, item: &T) -> Self;
}

impl<T: Ord> Without<T> for BTreeSet<T> {
    fn without(self, item: &T) -> Self {
        let mut set = self;
        set.remove(item);
        set
    }
}

impl<K: Ord, V> Without<K> for BTreeMap<K, V> {
    fn without(self, item: &K) -> Self {
        let mut map = self;
        map.remove(item);
        map
    }
}

/// Implemented by map-like collections allowing mapping over values.
pub trait MapValues<OldV, NewV> {
    type Result;

    fn map_values<F>(self, f: F) -> Self::Result
    where
        F: Fn(OldV) -> NewV;
}

/// Implemented by map-like collections allowing mapping over values by reference.
pub trait MapValuesRef<OldV, NewV> {
    type Result;

    fn map_values_ref<F>(&self, f: F) -> Self::Result
    where
        F: Fn(&OldV) -> NewV;
}

impl<K: Ord, OldV, NewV> MapValues<OldV, NewV> for BTreeMap<K, OldV> {
    type Result = BTreeMap<K, NewV>;

    fn map_values<F>(self, f: F) -> Self::Result
    where
        F: Fn(OldV) -> NewV,
    {
        self.into_iter().map(|(key, value)| (key, f(value))).collect()
    }
}

impl<K: Ord + Clone, OldV, NewV> MapValuesRef<OldV, NewV> for BTreeMap<K, OldV> {
    type Result = BTreeMap<K, NewV>;

    fn map_values_ref<F>(&self, f: F) -> Self::Result
    where
        F: Fn(&OldV) -> NewV,
    {
        self.iter().map(|(key, value)| (key.clone(), f(value))).collect()
    }
}

/// Implemented by map-like collections allowing mapping over boxed values,
/// downcasting them to a concrete type.
pub trait MapDowncast {
    type Result<T>;

    fn try_map_downcast<T: 'static>(self) -> Result<Self::Result<T>, LocalError>;
}

impl<K: Ord> MapDowncast for BTreeMap<K, Payload> {
    type Result<T> = BTreeMap<K, T>;

    fn try_map_downcast<T: 'static>(self) -> Result<Self::Result<T>, LocalError> {
        self.into_iter()
            .map(|(k, payload)| payload.downcast::<T>().map(|v| (k, v)))
            .collect::<Result<_, _>>()
    }
}

impl<K: Ord> MapDowncast for BTreeMap<K, Artifact> {
    type Result<T> = BTreeMap<K, T>;

    fn try_map_downcast<T: 'static>(self) -> Result<BTreeMap<K, T>, LocalError> {
        self.into_iter()
            .map(|(k, artifact)| artifact.downcast::<T>().map(|v| (k, v)))
            .collect::<Result<_, _>>()
    }
}
