use tracing::info;

use super::Store;
use crate::auth::password::hash_password;
use crate::config::EngineConfig;
use crate::error::ServiceResult;
use crate::model::department::DepartmentGroup;
use crate::model::role::Role;
use crate::model::setting::WHITELIST_KEY;
use crate::model::user::User;

pub const DEFAULT_DEPARTMENT: &str = "Management Team";

/// First-start bootstrap. Only fills what is missing, so running it on every
/// start is harmless.
pub async fn seed_defaults(store: &dyn Store, engine: &EngineConfig) -> ServiceResult<()> {
    for (i, phone) in engine.admin_phones.iter().enumerate() {
        if store.get_user(phone).await?.is_some() {
            continue;
        }
        let admin = User {
            phone: phone.clone(),
            name: format!("Admin{}", i + 1),
            departments: DEFAULT_DEPARTMENT.to_string(),
            password_hash: hash_password(&engine.default_admin_password)?,
            role: Role::Admin,
        };
        store.put_user(&admin).await?;
        info!(phone = %admin.phone, "Seeded admin user");
    }

    if store.get_setting(WHITELIST_KEY).await?.is_none() {
        store
            .put_setting(WHITELIST_KEY, &engine.admin_phones.join(","))
            .await?;
        info!(count = engine.admin_phones.len(), "Seeded admin whitelist");
    }

    if store.list_departments().await?.is_empty() {
        store
            .put_department(&DepartmentGroup {
                name: DEFAULT_DEPARTMENT.to_string(),
            })
            .await?;
        info!("Seeded default department group");
    }

    Ok(())
}
