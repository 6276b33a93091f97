//! CSSOM style sheet owned by a `<style>` element

use crate::{DomError, Result};

/// Rule list of one style sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    pub rules: Vec<String>,
}

impl StyleSheet {
    /// `insertRule`; returns the index the rule landed at
    pub fn insert_rule(&mut self, rule: &str, index: usize) -> Result<usize> {
        if index > self.rules.len() {
            return Err(DomError::IndexSize { index, len: self.rules.len() });
        }
        self.rules.insert(index, rule.to_string());
        Ok(index)
    }

    /// `deleteRule`
    pub fn delete_rule(&mut self, index: usize) -> Result<String> {
        if index >= self.rules.len() {
            return Err(DomError::IndexSize { index, len: self.rules.len() });
        }
        Ok(self.rules.remove(index))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
