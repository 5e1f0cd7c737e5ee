use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use sparkdef_core::{InterpreterGroup, InterpreterInfo, InterpreterRegistry, LazyOpenInterpreter};
use sparkdef_pipeline::{CompilingInterpreter, DepInterpreter, SparkdefConfig};

/// One notebook session: the sibling group plus handles to its members.
pub struct Session {
    pub registry: InterpreterRegistry,
    pub group: Arc<InterpreterGroup>,
    pub dep: Arc<DepInterpreter>,
    pub define: Arc<CompilingInterpreter>,
}

fn dep_info() -> InterpreterInfo {
    InterpreterInfo {
        name: "dep".into(),
        group: "spark".into(),
        class_name: DepInterpreter::CLASS_NAME.into(),
        properties: BTreeMap::new(),
    }
}

/// Register the built-in interpreters and assemble a session group.
///
/// The dependency loader joins the group behind a lazy-open layer, the way a
/// host keeps siblings closed until something actually uses them.
pub async fn start(note_id: &str, config: &SparkdefConfig) -> Result<Session> {
    let mut registry = InterpreterRegistry::new();
    registry.register(dep_info())?;
    registry.register(CompilingInterpreter::info())?;

    let group = Arc::new(InterpreterGroup::new(note_id));
    let dep = Arc::new(DepInterpreter::new());
    group
        .add(Arc::new(LazyOpenInterpreter::new(dep.clone())))
        .await;

    let define = Arc::new(CompilingInterpreter::from_config(&group, config));
    group.add(define.clone()).await;

    tracing::debug!(group = %group.id(), members = group.len().await, "Session started");
    Ok(Session {
        registry,
        group,
        dep,
        define,
    })
}
