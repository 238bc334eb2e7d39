use serde::{Deserialize, Serialize};
use std::fmt;

/// A postal address as returned by Companies House.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub care_of: Option<String>,
    pub po_box: Option<String>,
    pub premises: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Non-empty address parts in postal order.
    pub fn lines(&self) -> Vec<&str> {
        [
            &self.care_of,
            &self.po_box,
            &self.premises,
            &self.address_line_1,
            &self.address_line_2,
            &self.locality,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join(", "))
    }
}
