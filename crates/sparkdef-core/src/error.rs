use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("failed to open interpreter {class_name}: {reason}")]
    OpenFailed { class_name: String, reason: String },

    #[error("interpreter {group}.{name} is already registered")]
    AlreadyRegistered { group: String, name: String },

    #[error("interpreter group has been dropped")]
    GroupUnavailable,
}
