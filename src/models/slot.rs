use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub quota: i64,
    pub is_active: bool,
}
