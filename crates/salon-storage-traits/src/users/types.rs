//! Types for the users module

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::UserError;
use crate::UserId;

/// A portal account as the messaging core sees it: enough identity to
/// address messages, render sender names, and route notification emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The id of the user
    pub id: UserId,
    /// Email address, used as the notification-email target
    pub email: String,
    /// Display name shown alongside messages and typing indicators
    pub name: String,
    /// The role of the account within the portal
    pub role: UserRole,
}

/// The role of a portal account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserRole {
    /// A speaker profile
    Speaker,
    /// An event organizer
    Organizer,
    /// A portal administrator
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl UserRole {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Speaker => "speaker",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speaker" => Ok(Self::Speaker),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            _ => Err(UserError::InvalidParameters(format!(
                "Invalid user role: {}",
                s
            ))),
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
