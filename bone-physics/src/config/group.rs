// Copyright 2025 John Brosnihan
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
//! Case-insensitive configuration group names

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of a configuration group such as `"Breast"` or `"Belly"`
///
/// Group names compare, hash and sort case-insensitively. The spelling used
/// at creation is kept for display.
///
/// # Examples
///
/// ```
/// use bone_physics::config::GroupName;
///
/// assert_eq!(GroupName::from("Breast"), GroupName::from("BREAST"));
/// assert_eq!(GroupName::from("Breast").to_string(), "Breast");
/// ```
#[derive(Debug, Clone)]
pub struct GroupName {
    name: String,
    key: String,
}

impl GroupName {
    /// Create a group name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        GroupName { name, key }
    }

    /// The name as originally spelled
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The lowercase lookup key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive comparison against a plain string
    pub fn matches(&self, other: &str) -> bool {
        self.key == other.to_lowercase()
    }
}

impl PartialEq for GroupName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for GroupName {}

impl Hash for GroupName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for GroupName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl Borrow<str> for GroupName {
    fn borrow(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for GroupName {
    fn from(name: &str) -> Self {
        GroupName::new(name)
    }
}

impl From<String> for GroupName {
    fn from(name: String) -> Self {
        GroupName::new(name)
    }
}
