// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for selector compilation, matching and reservation sessions
//!
//! Every section deserializes with defaults for missing fields, so a
//! configuration loader only has to supply the settings it changes.
//!
//! # Examples
//!
//! ```rust
//! use fragpath::config::FragPathConfig;
//!
//! let config = FragPathConfig::from_json_str(r#"{"matcher": {"require_attribute_presence": false}}"#)
//!     .unwrap();
//! assert!(!config.matcher.require_attribute_presence);
//! assert!(config.compile.legacy_whitespace_separators);
//! ```

use crate::core::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings applied while turning selector text into steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Treat whitespace between names as a step separator (`a b c` is `a/b/c`)
    ///
    /// When disabled such whitespace is a compile error. Default: true
    pub legacy_whitespace_separators: bool,

    /// Keep a first token starting with `#` or `$` as a literal element name
    ///
    /// `#document` is always the document root regardless of this flag. Default: true
    pub allow_encoded_tokens: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            legacy_whitespace_separators: true,
            allow_encoded_tokens: true,
        }
    }
}

impl CompileConfig {
    /// Create configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable whitespace separated selectors
    pub fn with_legacy_whitespace_separators(mut self, enabled: bool) -> Self {
        self.legacy_whitespace_separators = enabled;
        self
    }

    /// Enable or disable encoded first tokens
    pub fn with_encoded_tokens(mut self, enabled: bool) -> Self {
        self.allow_encoded_tokens = enabled;
        self
    }
}

/// Settings applied while matching paths against fragments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Require the target element to carry the attribute named by an attribute target
    ///
    /// Applies identically to tree and stream fragments. Default: true
    pub require_attribute_presence: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            require_attribute_presence: true,
        }
    }
}

impl MatcherConfig {
    /// Create configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the attribute presence requirement
    pub fn with_attribute_presence(mut self, required: bool) -> Self {
        self.require_attribute_presence = required;
        self
    }
}

/// Settings for a tree-mode reservation session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Reservations taken through session fragments are visible to descendants
    /// wrapped afterwards. Default: false
    pub inheritable_reservations: bool,
}

impl SessionConfig {
    /// Create configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable inheritable reservations
    pub fn with_inheritable_reservations(mut self, inheritable: bool) -> Self {
        self.inheritable_reservations = inheritable;
        self
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragPathConfig {
    /// Compilation settings
    pub compile: CompileConfig,
    /// Matching settings
    pub matcher: MatcherConfig,
    /// Reservation session settings
    pub session: SessionConfig,
}

impl FragPathConfig {
    /// Create configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str(json)?;
        log::debug!("Loaded configuration: {config:?}");
        Ok(config)
    }

    /// Replace the compile settings
    pub fn with_compile(mut self, compile: CompileConfig) -> Self {
        self.compile = compile;
        self
    }

    /// Replace the matcher settings
    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the session settings
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}
