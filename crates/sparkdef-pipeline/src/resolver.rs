use std::sync::Arc;

use sparkdef_core::{Interpreter, InterpreterError, InterpreterGroup, Layer, LazyOpenInterpreter};

/// Find the concrete interpreter with identity `class_name` in `group`.
///
/// Each matching member is unwrapped through all of its decorator layers. If a
/// [`LazyOpenInterpreter`] sits anywhere in the chain it is opened before the
/// concrete interpreter is returned; that happens after the member list has
/// been released. When several members match, the last one wins.
///
/// Returns `Ok(None)` when nothing in the group matches.
pub async fn resolve_sibling(
    group: &InterpreterGroup,
    class_name: &str,
) -> Result<Option<Arc<dyn Interpreter>>, InterpreterError> {
    let members = group.snapshot().await;

    let mut lazy: Option<&LazyOpenInterpreter> = None;
    let mut concrete: Option<&Arc<dyn Interpreter>> = None;
    let mut matches = 0usize;

    for member in &members {
        if member.class_name() != class_name {
            continue;
        }
        matches += 1;

        let mut current = member;
        loop {
            match current.layer() {
                Layer::Concrete => break,
                Layer::Lazy(wrapper) => {
                    lazy = Some(wrapper);
                    current = wrapper.inner();
                }
                Layer::Wrapped(inner) => current = inner,
            }
        }
        concrete = Some(current);
    }

    if matches > 1 {
        tracing::warn!(
            group = %group.id(),
            class_name,
            matches,
            "Several siblings share one identity, using the last"
        );
    }

    let Some(concrete) = concrete else {
        tracing::debug!(group = %group.id(), class_name, "No sibling found");
        return Ok(None);
    };

    if let Some(lazy) = lazy {
        lazy.open().await?;
    }

    tracing::debug!(group = %group.id(), class_name, "Sibling resolved");
    Ok(Some(Arc::clone(concrete)))
}

/// Resolve the session's dependency loader.
pub async fn resolve_dependency_loader(
    group: &InterpreterGroup,
) -> Result<Option<Arc<dyn Interpreter>>, InterpreterError> {
    resolve_sibling(group, crate::dep::DepInterpreter::CLASS_NAME).await
}
