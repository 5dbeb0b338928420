use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable salon service (haircut, colouring, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub is_active: bool,
}
