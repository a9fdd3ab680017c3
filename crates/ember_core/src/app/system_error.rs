use thiserror::Error;

/// Errors raised while registering or running systems.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{system}' failed during {phase}: {source}")]
    Failed {
        system: String,
        phase: &'static str,
        #[source]
        source: Box<crate::Error>,
    },
}
