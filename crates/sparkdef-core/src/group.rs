use std::sync::Arc;

use tokio::sync::RwLock;

use crate::interpreter::Interpreter;

/// The shared set of cooperating interpreters of one session.
///
/// Members are only ever read through [`InterpreterGroup::snapshot`], which
/// copies the member list under the lock and releases it immediately. No
/// lock is held while a member is opened or asked to interpret.
pub struct InterpreterGroup {
    id: String,
    members: RwLock<Vec<Arc<dyn Interpreter>>>,
}

impl InterpreterGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn add(&self, interpreter: Arc<dyn Interpreter>) {
        let mut members = self.members.write().await;
        tracing::debug!(
            group = %self.id,
            class_name = interpreter.class_name(),
            "Interpreter added to group"
        );
        members.push(interpreter);
    }

    /// Remove every member with the given identity. Returns how many were removed.
    pub async fn remove(&self, class_name: &str) -> usize {
        let mut members = self.members.write().await;
        let before = members.len();
        members.retain(|m| m.class_name() != class_name);
        before - members.len()
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }

    /// Copy of the current member list.
    pub async fn snapshot(&self) -> Vec<Arc<dyn Interpreter>> {
        self.members.read().await.clone()
    }

    /// Close every member, in insertion order.
    pub async fn close_all(&self) {
        for member in self.snapshot().await {
            member.close().await;
        }
        tracing::debug!(group = %self.id, "Interpreter group closed");
    }
}
