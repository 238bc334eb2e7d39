//! Typed response models for the Companies House API.

mod address;
mod company;
mod search;

pub use address::Address;
pub use company::{
    AccountingReference, Accounts, Company, CompanyNumber, CompanyStatus, ConfirmationStatement,
};
pub use search::{
    AllSearchResult, CompanySearchItem, CompanySearchResult, DisqualifiedOfficerSearchItem,
    OfficerSearchItem, OfficerSearchResult, PartialDate, SearchItem, SearchResult,
};
