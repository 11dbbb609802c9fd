use serde::{Deserialize, Serialize};

/// Stored with every user for compatibility. Dashboard access is decided by
/// the `whitelist` setting, never by this value.
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Unknown or blank values fall back to `User`.
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or_default()
    }
}
