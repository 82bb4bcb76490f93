use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeystoneError>;

/// Bootstrap-time failures: module graph construction, dependency resolution
/// and middleware configuration.
#[derive(Debug, Error)]
pub enum KeystoneError {
    #[error(
        "Keystone cannot create the {parent} instance.\nReceived an unexpected value at index [{index}] of the {parent} \"imports\" array.\n\nScope [{}]",
        stringify_scope(.scope)
    )]
    InvalidModule {
        parent: String,
        index: usize,
        scope: Vec<String>,
    },

    #[error(
        "Keystone cannot create the {parent} instance.\nThe module at index [{index}] of the {parent} \"imports\" array is undefined.\n\nPotential causes:\n- A circular dependency between modules. Use a forward reference to avoid it.\n- The module at index [{index}] was never defined.\n\nScope [{}]",
        stringify_scope(.scope)
    )]
    UndefinedModule {
        parent: String,
        index: usize,
        scope: Vec<String>,
    },

    #[error(
        "A circular dependency has been detected{}. Please make sure that each side of a bidirectional relationship uses a forward reference.\n\nScope [{}]",
        context_suffix(.context),
        stringify_scope(.scope)
    )]
    CircularDependency {
        context: Option<String>,
        scope: Vec<String>,
    },

    #[error(
        "Keystone cannot export a provider/module that is not a part of the currently processed module ({module}). Please verify whether the exported {token} is available in this particular context.\n\nPossible Solutions:\n- Is {token} part of the relevant providers/imports within {module}?"
    )]
    UnknownExport { token: String, module: String },

    #[error("{}", unknown_dependencies_message(.type_name, .index, .dependencies, .module))]
    UnknownDependency {
        type_name: String,
        index: usize,
        dependencies: Vec<String>,
        module: String,
    },

    #[error("Module {key} is not registered in the container")]
    UnknownModule { key: String },

    #[error("Provider {token} is not registered in any module")]
    UnknownProvider { token: String },

    #[error("The middleware doesn't provide the 'handle' method ({name})")]
    InvalidMiddleware { name: String },

    #[error(
        "An invalid middleware configuration has been passed inside the module 'configure()' method."
    )]
    InvalidMiddlewareConfiguration,

    #[error(
        "{name} is marked as a scoped provider. Request and transient-scoped providers can't be used in combination with \"get()\" method. Please, use \"resolve()\" instead."
    )]
    InvalidClassScope { name: String },

    #[error("{name} has no instance in the current context of {module}")]
    UnavailableEnhancer { name: String, module: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Failed to construct {type_name}: {message}")]
    ConstructionFailed { type_name: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeystoneError {
    pub fn construction_failed(type_name: impl Into<String>, message: impl ToString) -> Self {
        Self::ConstructionFailed {
            type_name: type_name.into(),
            message: message.to_string(),
        }
    }
}

fn stringify_scope(scope: &[String]) -> String {
    scope.join(" -> ")
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" inside {}", context),
        None => String::new(),
    }
}

fn unknown_dependencies_message(
    type_name: &str,
    index: &usize,
    dependencies: &[String],
    module: &str,
) -> String {
    let index = *index;
    let dependency = dependencies
        .get(index)
        .map(String::as_str)
        .unwrap_or("dependency");
    let mut names: Vec<&str> = dependencies.iter().map(String::as_str).collect();
    if let Some(slot) = names.get_mut(index) {
        *slot = "?";
    }
    format!(
        "Keystone can't resolve dependencies of the {type_name} ({}). Please make sure that the argument {dependency} at index [{index}] is available in the {module} context.\n\nPotential solutions:\n- If {dependency} is a provider, is it part of the current {module}?\n- If {dependency} is exported from a separate module, is that module imported within {module}?",
        names.join(", "),
    )
}

impl axum::response::IntoResponse for KeystoneError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            KeystoneError::InvalidClassScope { .. } => axum::http::StatusCode::BAD_REQUEST,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_dependency_message_marks_missing_index() {
        let err = KeystoneError::UnknownDependency {
            type_name: "CatsService".to_string(),
            index: 1,
            dependencies: vec!["Config".to_string(), "Database".to_string()],
            module: "CatsModule".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("CatsService (Config, ?)"));
        assert!(message.contains("argument Database at index [1]"));
        assert!(message.contains("CatsModule context"));
    }

    #[test]
    fn test_scope_chain_rendering() {
        let err = KeystoneError::UndefinedModule {
            parent: "FeatureModule".to_string(),
            index: 0,
            scope: vec!["AppModule".to_string(), "FeatureModule".to_string()],
        };
        assert!(err.to_string().contains("Scope [AppModule -> FeatureModule]"));
    }
}
