use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InterpreterError;

/// Registration record for one interpreter kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterInfo {
    /// Short name used after the group in paragraph headers (`%group.name`).
    pub name: String,
    pub group: String,
    pub class_name: String,
    /// Configurable properties with their default values.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Interpreter kinds known to the host, filled in explicitly at startup.
#[derive(Debug, Default)]
pub struct InterpreterRegistry {
    entries: BTreeMap<(String, String), InterpreterInfo>,
}

impl InterpreterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: InterpreterInfo) -> Result<(), InterpreterError> {
        let key = (info.group.clone(), info.name.clone());
        if self.entries.contains_key(&key) {
            return Err(InterpreterError::AlreadyRegistered {
                group: info.group,
                name: info.name,
            });
        }
        tracing::debug!(
            group = %info.group,
            name = %info.name,
            class_name = %info.class_name,
            "Interpreter registered"
        );
        self.entries.insert(key, info);
        Ok(())
    }

    pub fn find(&self, group: &str, name: &str) -> Option<&InterpreterInfo> {
        self.entries.get(&(group.to_string(), name.to_string()))
    }

    pub fn list(&self) -> impl Iterator<Item = &InterpreterInfo> {
        self.entries.values()
    }
}
