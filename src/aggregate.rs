/// Accumulation of per-chunk results across a multi-chunk fetch
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DecodedRecord, GroupKey, WaveData};

impl WaveData {
    /// Concatenate a later chunk's sub-series onto this one.
    pub fn append(&mut self, chunk: WaveData) {
        self.waves.extend(chunk.waves);
        self.wind.extend(chunk.wind);
        self.surface_temp.extend(chunk.surface_temp);
        self.barometer.extend(chunk.barometer);
    }

    pub fn len(&self) -> usize {
        self.waves.len() + self.wind.len() + self.surface_temp.len() + self.barometer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded sensor records grouped by position or node, each group in
/// arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedCollection {
    groups: BTreeMap<GroupKey, Vec<DecodedRecord>>,
}

impl GroupedCollection {
    pub fn push(&mut self, record: DecodedRecord) {
        self.groups
            .entry(record.group.clone())
            .or_default()
            .push(record);
    }

    /// Merge a later batch; existing groups are appended to, not replaced.
    pub fn merge(&mut self, other: GroupedCollection) {
        for (key, records) in other.groups {
            self.groups.entry(key).or_default().extend(records);
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &GroupKey) -> Option<&[DecodedRecord]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[DecodedRecord])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Bristlemouth node ids that reported unmanaged data.
    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.groups
            .keys()
            .filter_map(|key| match key {
                GroupKey::Node(id) => Some(id.as_str()),
                GroupKey::Position(_) => None,
            })
            .collect()
    }
}

impl Extend<DecodedRecord> for GroupedCollection {
    fn extend<I: IntoIterator<Item = DecodedRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}
