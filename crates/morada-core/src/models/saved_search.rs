use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::gateway::Row;

use super::{epoch, str_field, time_field};

/// Named search criteria persisted for re-running later.
#[derive(Debug, Clone)]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    /// Opaque criteria blob; the data layer stores and returns it untouched.
    pub criteria: Value,
    pub created_at: DateTime<Utc>,
}

impl SavedSearch {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(SavedSearch {
            id: str_field(row, "id")?,
            name: str_field(row, "name")?,
            criteria: row.get("criteria").cloned().unwrap_or(Value::Null),
            created_at: time_field(row, "created_at").unwrap_or_else(epoch),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::row;
    use serde_json::json;

    #[test]
    fn test_criteria_round_trips_untouched() {
        let search = SavedSearch::from_row(&row(json!({
            "id": "s1",
            "name": "T2 Lisboa",
            "criteria": {"city": "Lisboa", "bedrooms": 2, "max_price": 250000},
            "created_at": "2026-01-02T08:00:00+00:00",
        })))
        .unwrap();

        assert_eq!(search.name, "T2 Lisboa");
        assert_eq!(search.criteria["bedrooms"], json!(2));
    }
}
