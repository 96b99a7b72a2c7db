//! Write-once store for linked decisions flowing between cells.

use capx_core::{CapxError, CapxResult, CellId, LinkingDecision};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Decisions keyed by the cell that produced them and the decision name.
/// Each slot is written exactly once; a second write for the same slot is a
/// bug in the plan and fails loudly.
#[derive(Debug, Default)]
pub struct LinkStore {
    decisions: Mutex<BTreeMap<(CellId, String), LinkingDecision>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, decision: LinkingDecision) -> CapxResult<()> {
        let key = (decision.produced_by, decision.name.clone());
        let mut decisions = self.decisions.lock().map_err(|_| {
            CapxError::Other("link store poisoned by a panicked cell".to_string())
        })?;
        if decisions.contains_key(&key) {
            return Err(CapxError::Other(format!(
                "decision '{}' from cell {} published twice",
                key.1, key.0
            )));
        }
        decisions.insert(key, decision);
        Ok(())
    }

    pub fn fetch(&self, producer: CellId, decision: &str) -> CapxResult<LinkingDecision> {
        let decisions = self.decisions.lock().map_err(|_| {
            CapxError::Other("link store poisoned by a panicked cell".to_string())
        })?;
        decisions
            .get(&(producer, decision.to_string()))
            .cloned()
            .ok_or_else(|| {
                CapxError::Other(format!(
                    "decision '{}' from cell {} was never published",
                    decision, producer
                ))
            })
    }

    pub fn len(&self) -> usize {
        self.decisions.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_decision_can_be_fetched() {
        let store = LinkStore::new();
        let cell = CellId::new(1, 1);
        let mut values = BTreeMap::new();
        values.insert(vec!["coal_1".to_string()], 120.0);
        store
            .publish(LinkingDecision::new("commitment", cell).with_values(values))
            .unwrap();
        let decision = store.fetch(cell, "commitment").unwrap();
        assert_eq!(decision.get(&vec!["coal_1".to_string()]), Some(120.0));
    }

    #[test]
    fn double_publish_is_rejected() {
        let store = LinkStore::new();
        let cell = CellId::new(1, 1);
        store
            .publish(LinkingDecision::new("commitment", cell))
            .unwrap();
        let err = store
            .publish(LinkingDecision::new("commitment", cell))
            .unwrap_err();
        assert!(err.to_string().contains("published twice"));
    }

    #[test]
    fn missing_decision_is_an_error() {
        let store = LinkStore::new();
        let err = store.fetch(CellId::new(1, 1), "commitment").unwrap_err();
        assert!(err.to_string().contains("never published"));
    }
}
