//! HCP record and filter types.

use serde::{Deserialize, Serialize};

/// A healthcare professional tracked in the contact store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HcpRecord {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    pub city: String,
    pub preferred_channel: String,
    pub contacted: bool,
}

/// Filter for querying HCP records.
///
/// Every field is optional; set fields are matched exactly (case-sensitive).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HcpFilter {
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub contacted: Option<bool>,
}

impl HcpFilter {
    pub fn specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn contacted(mut self, contacted: bool) -> Self {
        self.contacted = Some(contacted);
        self
    }
}
