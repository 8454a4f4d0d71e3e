use thiserror::Error;

#[derive(Debug, Error)]
pub enum UminError {
    #[error("not initialized: run 'umin init'")]
    NotInitialized,

    #[error("no items selected: select at least one item to perform an action")]
    NothingSelected,

    #[error("no action named '{0}'")]
    ActionNotFound(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("{model} #{id} not found")]
    RecordNotFound { model: String, id: i64 },

    #[error("confirmation required: resubmit with the confirmation token")]
    MissingConfirmation,

    #[error("confirmation token does not match this selection")]
    InvalidConfirmation,

    #[error("invalid selection value '{0}': expected an integer id")]
    InvalidSelection(String),

    #[error("unknown field '{field}' on model '{model}'")]
    InvalidField { model: String, field: String },

    #[error("invalid model name '{0}': must be lowercase alphanumeric with underscores")]
    InvalidModelName(String),

    #[error("unknown operation '{0}': expected view, add, change or delete")]
    InvalidOperation(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl UminError {
    /// Errors caused by what the caller submitted. These are shown to the
    /// caller as a message and never treated as a server fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            UminError::NothingSelected
                | UminError::ActionNotFound(_)
                | UminError::MissingConfirmation
                | UminError::InvalidConfirmation
                | UminError::InvalidSelection(_)
                | UminError::InvalidField { .. }
                | UminError::InvalidModelName(_)
                | UminError::InvalidOperation(_)
                | UminError::ActionFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, UminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_problems_are_user_errors() {
        assert!(UminError::NothingSelected.is_user_error());
        assert!(UminError::ActionNotFound("nuke".into()).is_user_error());
        assert!(UminError::MissingConfirmation.is_user_error());
        assert!(UminError::InvalidConfirmation.is_user_error());
        assert!(UminError::ActionFailed {
            action: "export_csv".into(),
            reason: "boom".into()
        }
        .is_user_error());
    }

    #[test]
    fn infrastructure_problems_are_not_user_errors() {
        assert!(!UminError::NotInitialized.is_user_error());
        assert!(!UminError::Store("disk gone".into()).is_user_error());
        assert!(!UminError::PermissionDenied("delete".into()).is_user_error());
        assert!(!UminError::Io(std::io::Error::other("x")).is_user_error());
    }

    #[test]
    fn nothing_selected_message_is_readable() {
        assert_eq!(
            UminError::NothingSelected.to_string(),
            "no items selected: select at least one item to perform an action"
        );
    }
}
