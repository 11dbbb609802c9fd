use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub phone: String,
    pub name: String,
    /// Comma-joined department group names.
    pub departments: String,
    pub password_hash: String,
    pub role: Role,
}

/// What the API is allowed to show about a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    #[schema(example = "9800000001")]
    pub phone: String,
    #[schema(example = "Asha")]
    pub name: String,
    #[schema(example = json!(["Management Team"]))]
    pub departments: Vec<String>,
    #[schema(example = "User", value_type = String)]
    pub role: Role,
    pub is_admin: bool,
}

impl UserProfile {
    pub fn from_user(user: &User, is_admin: bool) -> Self {
        Self {
            phone: user.phone.clone(),
            name: user.name.clone(),
            departments: crate::config::split_list(&user.departments),
            role: user.role,
            is_admin,
        }
    }
}

/// Partial update of a user row. `phone` renames the key.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub phone: Option<String>,
    pub name: Option<String>,
    pub departments: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none()
            && self.name.is_none()
            && self.departments.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(phone) = &self.phone {
            user.phone = phone.clone();
        }
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(departments) = &self.departments {
            user.departments = departments.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}
