use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Address;
use crate::error::ApiError;

/// A validated, normalised company registration number.
///
/// Numbers are 8 characters: either 8 digits, or a 2-letter prefix (`SC`,
/// `NI`, `OC`, ...) followed by 6 digits. Whitespace is dropped, letters are
/// upper-cased and short all-digit numbers are zero-padded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompanyNumber(String);

impl CompanyNumber {
    pub const LENGTH: usize = 8;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CompanyNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CompanyNumber {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        if normalized.is_empty() {
            return Err(ApiError::validation("Company number cannot be empty"));
        }

        if normalized.len() < Self::LENGTH && normalized.chars().all(|c| c.is_ascii_digit()) {
            normalized = format!("{:0>width$}", normalized, width = Self::LENGTH);
        }

        let bytes = normalized.as_bytes();
        let well_formed = bytes.len() == Self::LENGTH
            && bytes[2..].iter().all(u8::is_ascii_digit)
            && (bytes[..2].iter().all(u8::is_ascii_digit)
                || bytes[..2].iter().all(u8::is_ascii_uppercase));

        if !well_formed {
            return Err(ApiError::validation(format!(
                "Invalid company number: {}",
                s.trim()
            )));
        }

        Ok(CompanyNumber(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompanyStatus {
    Active,
    Dissolved,
    Liquidation,
    Receivership,
    Administration,
    VoluntaryArrangement,
    ConvertedClosed,
    InsolvencyProceedings,
    Registered,
    Removed,
    Closed,
    Open,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountingReference {
    pub day: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Accounts {
    pub accounting_reference_date: Option<AccountingReference>,
    pub next_due: Option<NaiveDate>,
    pub next_made_up_to: Option<NaiveDate>,
    #[serde(default)]
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfirmationStatement {
    pub last_made_up_to: Option<NaiveDate>,
    pub next_due: Option<NaiveDate>,
    pub next_made_up_to: Option<NaiveDate>,
    #[serde(default)]
    pub overdue: bool,
}

/// Company profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_number: String,
    pub company_name: String,
    pub company_status: Option<CompanyStatus>,
    pub company_status_detail: Option<String>,
    #[serde(rename = "type")]
    pub company_type: Option<String>,
    pub jurisdiction: Option<String>,
    pub date_of_creation: Option<NaiveDate>,
    pub date_of_cessation: Option<NaiveDate>,
    pub registered_office_address: Option<Address>,
    #[serde(default)]
    pub sic_codes: Vec<String>,
    pub accounts: Option<Accounts>,
    pub confirmation_statement: Option<ConfirmationStatement>,
    pub has_charges: Option<bool>,
    pub has_insolvency_history: Option<bool>,
    pub can_file: Option<bool>,
    pub etag: Option<String>,
}

impl Company {
    pub fn is_active(&self) -> bool {
        self.company_status == Some(CompanyStatus::Active)
    }
}
