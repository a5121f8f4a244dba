//! User identity and profile model

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::form::TextRule;
use super::ValidationErrors;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("Invalid regex"));

const REG_FIRST_NAME: TextRule = TextRule::required("first_name", 20);
const REG_LAST_NAME: TextRule = TextRule::required("last_name", 20);
const REG_USERNAME: TextRule = TextRule::required("username", 20);

/// Identity of an authenticated user (the token subject).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Registration timestamp (Unix ms)
    pub created_at: i64,
}

/// Registration input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

impl RegistrationForm {
    /// Validate the form and build the profile for `subject`.
    ///
    /// Username uniqueness needs the store and is checked by the caller.
    pub fn clean(&self, subject: &UserId) -> Result<UserProfile, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let first_name = REG_FIRST_NAME.check(&mut errors, &self.first_name);
        let last_name = REG_LAST_NAME.check(&mut errors, &self.last_name);
        let username = REG_USERNAME.check(&mut errors, &self.username);
        if !username.is_empty() && !USERNAME_RE.is_match(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        errors.into_result(UserProfile {
            id: subject.clone(),
            username,
            first_name,
            last_name,
            created_at: crate::util::unix_millis_now(),
        })
    }
}
