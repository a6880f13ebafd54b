//! Error types for the player core

/// Errors returned by plugin registries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// A plugin with the same name is already registered in this scope
    #[error("Plugin already exists: {0}")]
    AlreadyExists(String),

    /// No plugin with this name is registered in this scope
    #[error("Plugin not found: {0}")]
    NotFound(String),
}

/// Main error type for the player core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The core has already been destroyed
    #[error("Core has been destroyed")]
    Destroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(CoreError::Destroyed.to_string(), "Core has been destroyed");
        assert_eq!(
            PluginError::AlreadyExists("poster".into()).to_string(),
            "Plugin already exists: poster"
        );
    }
}
