use serde::{Deserialize, Serialize};

/// Fabrication attributes that drive the complexity score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplexityModifiers {
    pub custom_molding: bool,
    pub multiple_openings: bool,
    pub special_glass: bool,
    pub oversized: bool,
    pub artwork_prep: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerPreferences {
    /// Allowed local start hours for the task, when the customer cares.
    pub preferred_start_hours: Option<Vec<u32>>,
}

/// Scheduling request for one framing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderScheduleInput {
    pub order_id: String,
    pub estimated_hours: f64,
    /// Lower value means higher precedence; must be at least 1.
    pub priority: i64,
    /// RFC 3339 deadline for the finished work.
    pub deadline: String,
    #[serde(default)]
    pub modifiers: ComplexityModifiers,
    /// Order ids this order depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub preferences: CustomerPreferences,
}

/// Mirror of the externally owned order row, limited to the schedule
/// fields this engine maintains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    pub scheduled_start: Option<String>,
    pub scheduled_end: Option<String>,
    pub status: String,
    pub updated_at: String,
}
