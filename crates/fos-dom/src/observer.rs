//! DOM Observers
//!
//! MutationObserver registry. Records are queued per observer and handed
//! over in batches through `take_records`.

use std::cell::Cell;
use std::rc::Rc;

use crate::NodeId;

/// Observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Everything, with old values
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_old_value: true,
            character_data_old_value: true,
            attribute_filter: None,
        }
    }
}

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    /// Position in the document's record order, starting at 1
    pub sequence: u64,
}

impl MutationRecord {
    pub(crate) fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value,
            sequence: 0,
        }
    }

    pub(crate) fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value: Some(old_value),
            sequence: 0,
        }
    }

    pub(crate) fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
            sequence: 0,
        }
    }
}

/// Shared counter of records queued on one document
///
/// Hooks that fire outside the record queue read it to learn which
/// records came before them.
#[derive(Debug, Clone, Default)]
pub struct MutationSequence(Rc<Cell<u64>>);

impl MutationSequence {
    /// Sequence of the last queued record, 0 before any
    pub fn current(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self) -> u64 {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation observer
#[derive(Debug)]
struct MutationObserver {
    id: ObserverId,
    target: NodeId,
    options: MutationObserverInit,
    records: Vec<MutationRecord>,
}

impl MutationObserver {
    fn wants(&self, record: &MutationRecord, in_subtree: bool) -> bool {
        if !in_subtree && record.target != self.target {
            return false;
        }
        match record.mutation_type {
            MutationType::ChildList => self.options.child_list,
            MutationType::CharacterData => self.options.character_data,
            MutationType::Attributes => {
                self.options.attributes
                    && match (&self.options.attribute_filter, &record.attribute_name) {
                        (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                        _ => true,
                    }
            }
        }
    }
}

/// All mutation observers registered on one document
#[derive(Debug, Default)]
pub(crate) struct MutationObservers {
    observers: Vec<MutationObserver>,
    next_id: u64,
    sequence: MutationSequence,
}

impl MutationObservers {
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.push(MutationObserver {
            id,
            target,
            options,
            records: Vec::new(),
        });
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        before != self.observers.len()
    }

    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers.iter_mut()
            .find(|o| o.id == id)
            .map(|o| std::mem::take(&mut o.records))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn sequence(&self) -> MutationSequence {
        self.sequence.clone()
    }

    /// Queue a record for every interested observer. `in_subtree` tells
    /// whether the target lies under an observer's target.
    pub fn queue(&mut self, mut record: MutationRecord, in_subtree: impl Fn(NodeId) -> bool) {
        record.sequence = self.sequence.advance();
        for observer in self.observers.iter_mut() {
            let inside = observer.options.subtree && in_subtree(observer.target);
            if !observer.wants(&record, inside) {
                continue;
            }
            let mut record = record.clone();
            let keep_old = match record.mutation_type {
                MutationType::Attributes => observer.options.attribute_old_value,
                MutationType::CharacterData => observer.options.character_data_old_value,
                MutationType::ChildList => true,
            };
            if !keep_old {
                record.old_value = None;
            }
            observer.records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_observer_filtering() {
        let mut observers = MutationObservers::default();
        let id = observers.observe(NodeId(1), MutationObserverInit {
            attributes: true,
            attribute_filter: Some(vec!["class".to_string()]),
            ..Default::default()
        });

        observers.queue(MutationRecord::attributes(NodeId(1), "class", Some("a".into())), |_| false);
        observers.queue(MutationRecord::attributes(NodeId(1), "id", None), |_| false);
        observers.queue(MutationRecord::character_data(NodeId(1), "x".into()), |_| false);

        let records = observers.take_records(id);
        assert_eq!(records.len(), 1);
        // attribute_old_value not requested
        assert_eq!(records[0].old_value, None);
        assert!(observers.take_records(id).is_empty());
    }

    #[test]
    fn test_records_carry_sequence() {
        let mut observers = MutationObservers::default();
        let id = observers.observe(NodeId::ROOT, MutationObserverInit::all());
        let sequence = observers.sequence();
        assert_eq!(sequence.current(), 0);

        observers.queue(MutationRecord::attributes(NodeId(2), "class", None), |_| true);
        observers.queue(MutationRecord::character_data(NodeId(3), "x".into()), |_| true);
        let records = observers.take_records(id);
        assert_eq!(records.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(sequence.current(), 2);
    }

    #[test]
    fn test_disconnect() {
        let mut observers = MutationObservers::default();
        let id = observers.observe(NodeId::ROOT, MutationObserverInit::all());
        assert!(observers.disconnect(id));
        assert!(!observers.disconnect(id));
        assert!(observers.is_empty());
    }
}
