//! Undefined-value handling for loaded records

use serde::{Serialize, Deserialize};

/// Raw values that stand for "explicitly undefined" in Number and Dates
/// attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UndefinedTokens {
    /// Patterns to treat as undefined
    pub patterns: Vec<String>,

    /// Whether to trim whitespace before checking
    pub trim_whitespace: bool,
}

impl Default for UndefinedTokens {
    fn default() -> Self {
        Self {
            patterns: vec!["?".to_string()],
            trim_whitespace: true,
        }
    }
}

impl UndefinedTokens {
    /// Check if a raw value should be treated as undefined
    pub fn is_undefined(&self, value: &str) -> bool {
        let test_value = if self.trim_whitespace {
            value.trim()
        } else {
            value
        };

        self.patterns.iter().any(|pattern| test_value == pattern)
    }

    /// Add an undefined pattern
    pub fn add_pattern(&mut self, pattern: String) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }
}
