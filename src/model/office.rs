use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Office {
    #[schema(example = "HQ")]
    pub name: String,
    #[schema(example = 18.9435)]
    pub latitude: f64,
    #[schema(example = 72.8382)]
    pub longitude: f64,
    #[schema(example = 350.0)]
    pub radius_meters: f64,
}
