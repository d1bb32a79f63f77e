use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SCOPE_DEPTH: usize = 1024;

/// Default nesting limit of the parser, low enough to stay well inside a 2 MiB thread
/// stack. [`InterpreterConfig::max_scope_depth`] overrides it through
/// [`api::parse_with_config`](crate::api::parse_with_config).
pub const DEFAULT_MAX_PARSE_DEPTH: usize = 128;

/// Tunables for an [`Interpreter`](crate::interpreter::Interpreter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Maximum number of scopes the interpreter's stack may hold.
    pub max_scope_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_scope_depth: DEFAULT_MAX_SCOPE_DEPTH,
        }
    }
}

impl InterpreterConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn with_max_scope_depth(mut self, max_scope_depth: usize) -> Self {
        self.max_scope_depth = max_scope_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let config = InterpreterConfig::from_json_str(r#"{"max_scope_depth": 8}"#).unwrap();
        assert_eq!(config.max_scope_depth, 8);
        let config = InterpreterConfig::from_yaml_str("max_scope_depth: 16\n").unwrap();
        assert_eq!(config.max_scope_depth, 16);
        let config = InterpreterConfig::from_json_str("{}").unwrap();
        assert_eq!(config, InterpreterConfig::default());
    }
}
