//! Conversion options.
//!
//! Options are layered, lowest priority first:
//!
//! 1. [`ConversionOptions::default`]
//! 2. a JSON config file ([`ConversionOptions::from_file`])
//! 3. `DWSGEN_*` environment variables, `.env` included ([`ConversionOptions::apply_env`])
//! 4. CLI flags or API form fields, set directly on the struct
//!
//! Call [`ConversionOptions::validate`] once the layers are applied.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// epMotion refuses method file names longer than this.
pub const MAX_METHOD_NAME_LEN: usize = 20;

pub const ENV_START_INDEX: &str = "DWSGEN_START_INDEX";
pub const ENV_SEPARATOR: &str = "DWSGEN_SEPARATOR";
pub const ENV_METHOD_NAME: &str = "DWSGEN_METHOD_NAME";
pub const ENV_METHOD_COMMENT: &str = "DWSGEN_METHOD_COMMENT";
pub const ENV_STRICT_MODE: &str = "DWSGEN_STRICT_MODE";

/// Options for the conversion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Separator between `key=value` pairs inside packed columns
    pub separator: char,

    /// Only template keys and packed columns reach the output
    pub strict_mode: bool,

    /// Number of the first command section
    pub start_index: u32,

    /// Method name, written to `[Properties]` and used for the file name
    pub method_name: String,

    /// Method comment, written to `[Properties]`
    pub method_comment: String,

    /// Output file (default: `<method name><yymmdd-HHMM>.dws`)
    pub output: Option<PathBuf>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            separator: '|',
            strict_mode: true,
            start_index: 1,
            method_name: "DWSoutput".to_string(),
            method_comment: String::new(),
            output: None,
        }
    }
}

impl ConversionOptions {
    /// Load options from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let mut options = Self::default();
        options.apply_env()?;
        Ok(options)
    }

    /// Override fields from `DWSGEN_*` environment variables.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Override fields from any variable source.
    pub fn apply_vars<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_START_INDEX) {
            self.start_index = value.trim().parse().map_err(|_| invalid_env(ENV_START_INDEX, &value))?;
        }
        if let Some(value) = lookup(ENV_SEPARATOR) {
            let mut chars = value.chars();
            self.separator = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(invalid_env(ENV_SEPARATOR, &value)),
            };
        }
        if let Some(value) = lookup(ENV_METHOD_NAME) {
            self.method_name = value;
        }
        if let Some(value) = lookup(ENV_METHOD_COMMENT) {
            self.method_comment = value;
        }
        if let Some(value) = lookup(ENV_STRICT_MODE) {
            self.strict_mode = parse_bool(&value).ok_or_else(|| invalid_env(ENV_STRICT_MODE, &value))?;
        }
        Ok(())
    }

    /// Check the options before any row is processed.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.strict_mode {
            return Err(ConfigError::PermissiveModeUnsupported);
        }
        if self.separator == '=' {
            return Err(ConfigError::InvalidSeparator(self.separator));
        }
        if self.method_name.chars().count() > MAX_METHOD_NAME_LEN {
            return Err(ConfigError::MethodNameTooLong(self.method_name.clone()));
        }
        Ok(())
    }
}

fn invalid_env(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_options() {
        let opts = ConversionOptions::default();
        assert_eq!(opts.separator, '|');
        assert!(opts.strict_mode);
        assert_eq!(opts.start_index, 1);
        assert_eq!(opts.method_name, "DWSoutput");
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_apply_vars() {
        let env = vars(&[
            (ENV_START_INDEX, "5"),
            (ENV_SEPARATOR, ";"),
            (ENV_METHOD_NAME, "PCRsetup"),
        ]);
        let mut opts = ConversionOptions::default();
        opts.apply_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(opts.start_index, 5);
        assert_eq!(opts.separator, ';');
        assert_eq!(opts.method_name, "PCRsetup");
        assert_eq!(opts.method_comment, "");
    }

    #[test]
    fn test_apply_vars_rejects_garbage() {
        let env = vars(&[(ENV_START_INDEX, "-1")]);
        let mut opts = ConversionOptions::default();
        assert!(matches!(
            opts.apply_vars(|k| env.get(k).cloned()),
            Err(ConfigError::InvalidEnv { .. })
        ));

        let env = vars(&[(ENV_SEPARATOR, "||")]);
        assert!(opts.apply_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_permissive_mode_rejected() {
        let env = vars(&[(ENV_STRICT_MODE, "false")]);
        let mut opts = ConversionOptions::default();
        opts.apply_vars(|k| env.get(k).cloned()).unwrap();
        assert!(matches!(opts.validate(), Err(ConfigError::PermissiveModeUnsupported)));
    }

    #[test]
    fn test_method_name_limit() {
        let opts = ConversionOptions {
            method_name: "x".repeat(MAX_METHOD_NAME_LEN),
            ..Default::default()
        };
        assert!(opts.validate().is_ok());

        let opts = ConversionOptions {
            method_name: "x".repeat(MAX_METHOD_NAME_LEN + 1),
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(ConfigError::MethodNameTooLong(_))));
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dwsgen.json");
        std::fs::write(&path, r#"{ "startIndex": 0, "methodComment": "qPCR plate" }"#).unwrap();

        let opts = ConversionOptions::from_file(&path).unwrap();
        assert_eq!(opts.start_index, 0);
        assert_eq!(opts.method_comment, "qPCR plate");
        assert_eq!(opts.separator, '|');
        assert!(opts.strict_mode);
    }
}
