//! Scope id allocation

use std::collections::HashMap;
use std::fmt;

/// Stable numeric id of a scope name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// No language
    pub const NULL: ScopeId = ScopeId(0);
    /// Plain text
    pub const PLAIN_TEXT: ScopeId = ScopeId(1);
    /// First id handed out for a scope name
    pub const FIRST: ScopeId = ScopeId(2);
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assigns ids to scope names in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ScopeIds {
    ids: HashMap<String, ScopeId>,
}

impl ScopeIds {
    /// Id for `scope_name`, allocating the next one if unseen
    pub fn get_or_pull(&mut self, scope_name: &str) -> ScopeId {
        if let Some(id) = self.ids.get(scope_name) {
            return *id;
        }
        let id = ScopeId(ScopeId::FIRST.0 + self.ids.len() as u32);
        self.ids.insert(scope_name.to_string(), id);
        id
    }

    pub fn get(&self, scope_name: &str) -> Option<ScopeId> {
        self.ids.get(scope_name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
