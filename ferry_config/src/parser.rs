use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;

/// Minimal TOML reader covering the subset settings files use:
/// `[section]` headers, `key = value` pairs, `#` comments.
pub struct SettingsParser;

impl SettingsParser {
    /// Parse settings text into a map keyed by `section.key`
    pub fn parse(content: &str) -> ConfigResult<HashMap<String, SettingValue>> {
        let mut result = HashMap::new();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = strip_comment(line).trim();

            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse {
                    line: line_num + 1,
                    message: format!("expected `key = value`, found '{}'", line),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Parse {
                    line: line_num + 1,
                    message: "missing key".to_string(),
                });
            }

            let full_key = if current_section.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", current_section, key)
            };

            let value = Self::parse_value(value.trim()).map_err(|message| ConfigError::Parse {
                line: line_num + 1,
                message,
            })?;
            result.insert(full_key, value);
        }

        Ok(result)
    }

    fn parse_value(value: &str) -> Result<SettingValue, String> {
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            return Ok(SettingValue::String(value[1..value.len() - 1].to_string()));
        }
        match value {
            "true" => return Ok(SettingValue::Bool(true)),
            "false" => return Ok(SettingValue::Bool(false)),
            _ => {}
        }
        // TOML allows `_` as a digit separator
        let digits: String = value.chars().filter(|&c| c != '_').collect();
        if let Ok(int_val) = digits.parse::<i64>() {
            return Ok(SettingValue::Integer(int_val));
        }
        Err(format!("unsupported value '{}'", value))
    }
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Value types a settings file may hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    String(String),
    Integer(i64),
    Bool(bool),
}

impl SettingValue {
    /// Get value as integer or return error
    pub fn as_integer(&self, key: &str) -> ConfigResult<i64> {
        match self {
            SettingValue::Integer(i) => Ok(*i),
            _ => Err(ConfigError::Validation(format!(
                "`{}` expects an integer value",
                key
            ))),
        }
    }

    /// Get value as boolean or return error
    pub fn as_bool(&self, key: &str) -> ConfigResult<bool> {
        match self {
            SettingValue::Bool(b) => Ok(*b),
            _ => Err(ConfigError::Validation(format!(
                "`{}` expects a boolean value",
                key
            ))),
        }
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::String(s) => write!(f, "\"{}\"", s),
            SettingValue::Integer(i) => write!(f, "{}", i),
            SettingValue::Bool(b) => write!(f, "{}", b),
        }
    }
}
