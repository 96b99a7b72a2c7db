//! Linking decisions carried between solve cells.

use crate::cell::CellId;
use crate::model::IndexKey;
use std::collections::BTreeMap;

/// A named, keyed set of values produced by one cell's solve and fixed as
/// input in downstream cells (e.g. a commitment schedule carried from a
/// day-ahead stage into a real-time stage).
///
/// Immutable once produced: consumers only read, and the linking store
/// publishes each (producer, name) pair exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkingDecision {
    pub name: String,
    pub produced_by: CellId,
    values: BTreeMap<IndexKey, f64>,
}

impl LinkingDecision {
    pub fn new(name: impl Into<String>, produced_by: CellId) -> Self {
        Self {
            name: name.into(),
            produced_by,
            values: BTreeMap::new(),
        }
    }

    pub fn with_values(mut self, values: BTreeMap<IndexKey, f64>) -> Self {
        self.values = values;
        self
    }

    pub fn get(&self, key: &IndexKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn values(&self) -> impl Iterator<Item = (&IndexKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_lookup_by_index_key() {
        let producer = CellId::new(1, 1);
        let mut values = BTreeMap::new();
        values.insert(vec!["plant_a".to_string(), "tp1".to_string()], 1.0);
        let decision = LinkingDecision::new("commitment", producer).with_values(values);

        assert_eq!(decision.len(), 1);
        assert_eq!(
            decision.get(&vec!["plant_a".to_string(), "tp1".to_string()]),
            Some(1.0)
        );
        assert_eq!(decision.get(&vec!["plant_b".to_string()]), None);
    }
}
