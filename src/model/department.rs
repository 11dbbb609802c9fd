use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentGroup {
    #[schema(example = "Management Team")]
    pub name: String,
}
