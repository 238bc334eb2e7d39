use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Address;

/// One page of search results.
///
/// `has_more_pages` and `next_start_index` are taken from the response when
/// the API reports them, and derived from the page window otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub items_per_page: u32,
    #[serde(default)]
    pub start_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "has_more_pages", skip_serializing_if = "Option::is_none")]
    pub reported_has_more_pages: Option<bool>,
    #[serde(rename = "next_start_index", skip_serializing_if = "Option::is_none")]
    pub reported_next_start_index: Option<u32>,
}

impl<T> SearchResult<T> {
    fn page_len(&self) -> u32 {
        if self.items_per_page > 0 {
            self.items_per_page
        } else {
            self.items.len() as u32
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.reported_has_more_pages.unwrap_or_else(|| {
            let page_len = self.page_len();
            page_len > 0 && self.start_index.saturating_add(page_len) < self.total_results
        })
    }

    pub fn next_start_index(&self) -> u32 {
        self.reported_next_start_index
            .unwrap_or_else(|| self.start_index.saturating_add(self.page_len()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanySearchItem {
    pub company_number: String,
    pub title: String,
    pub company_status: Option<String>,
    pub company_type: Option<String>,
    pub date_of_creation: Option<NaiveDate>,
    pub date_of_cessation: Option<NaiveDate>,
    pub address_snippet: Option<String>,
    pub address: Option<Address>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Month/year birth date; officers' day of birth is never published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OfficerSearchItem {
    pub title: String,
    pub appointment_count: Option<u32>,
    pub date_of_birth: Option<PartialDate>,
    pub address_snippet: Option<String>,
    pub address: Option<Address>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisqualifiedOfficerSearchItem {
    pub title: String,
    pub date_of_birth: Option<String>,
    pub address_snippet: Option<String>,
    pub address: Option<Address>,
    pub description: Option<String>,
}

/// An entry from the mixed `/search` endpoint, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SearchItem {
    #[serde(rename = "searchresults#company")]
    Company(CompanySearchItem),
    #[serde(rename = "searchresults#officer")]
    Officer(OfficerSearchItem),
    #[serde(rename = "searchresults#disqualified-officer")]
    DisqualifiedOfficer(DisqualifiedOfficerSearchItem),
    #[serde(other)]
    Other,
}

pub type CompanySearchResult = SearchResult<CompanySearchItem>;
pub type OfficerSearchResult = SearchResult<OfficerSearchItem>;
pub type AllSearchResult = SearchResult<SearchItem>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_search_result() {
        let result: CompanySearchResult = serde_json::from_str(
            r#"{
                "kind": "search#companies",
                "total_results": 45,
                "items_per_page": 20,
                "start_index": 0,
                "page_number": 1,
                "items": [{
                    "kind": "searchresults#company",
                    "company_number": "12345678",
                    "title": "ACME WIDGETS LIMITED",
                    "company_status": "active",
                    "company_type": "ltd",
                    "date_of_creation": "2019-06-01",
                    "address_snippet": "1 High Street, London, SW1A 1AA"
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "ACME WIDGETS LIMITED");
        assert!(result.has_more_pages());
        assert_eq!(result.next_start_index(), 20);
    }

    #[test]
    fn test_has_more_pages_derived_last_page() {
        let result: CompanySearchResult = serde_json::from_str(
            r#"{"total_results": 45, "items_per_page": 20, "start_index": 40, "items": []}"#,
        )
        .unwrap();
        assert!(!result.has_more_pages());
        assert_eq!(result.next_start_index(), 60);
    }

    #[test]
    fn test_reported_fields_take_priority() {
        let result: AllSearchResult = serde_json::from_str(
            r#"{
                "total_results": 10,
                "items_per_page": 20,
                "start_index": 0,
                "has_more_pages": true,
                "next_start_index": 7,
                "items": []
            }"#,
        )
        .unwrap();
        assert!(result.has_more_pages());
        assert_eq!(result.next_start_index(), 7);
    }

    #[test]
    fn test_empty_page_has_no_more_pages() {
        let result: AllSearchResult = serde_json::from_str(r#"{"total_results": 100}"#).unwrap();
        assert!(!result.has_more_pages());
        assert_eq!(result.next_start_index(), 0);
    }

    #[test]
    fn test_page_len_falls_back_to_item_count() {
        let result: OfficerSearchResult = serde_json::from_str(
            r#"{"total_results": 3, "start_index": 0, "items": [{"title": "A"}, {"title": "B"}]}"#,
        )
        .unwrap();
        assert!(result.has_more_pages());
        assert_eq!(result.next_start_index(), 2);
    }

    #[test]
    fn test_all_search_mixed_items() {
        let result: AllSearchResult = serde_json::from_str(
            r#"{
                "total_results": 3,
                "items_per_page": 20,
                "start_index": 0,
                "items": [
                    {"kind": "searchresults#company", "company_number": "12345678", "title": "ACME LTD"},
                    {"kind": "searchresults#officer", "title": "SMITH, John",
                     "appointment_count": 2, "date_of_birth": {"month": 4, "year": 1970}},
                    {"kind": "searchresults#disqualified-officer", "title": "DOE, Jane"},
                    {"kind": "searchresults#something-else", "title": "???"}
                ]
            }"#,
        )
        .unwrap();

        assert!(!result.has_more_pages());
        assert!(matches!(&result.items[0], SearchItem::Company(c) if c.company_number == "12345678"));
        match &result.items[1] {
            SearchItem::Officer(officer) => {
                assert_eq!(officer.appointment_count, Some(2));
                assert_eq!(
                    officer.date_of_birth,
                    Some(PartialDate {
                        month: 4,
                        year: 1970
                    })
                );
            }
            other => panic!("Expected officer, got {:?}", other),
        }
        assert!(matches!(&result.items[2], SearchItem::DisqualifiedOfficer(_)));
        assert_eq!(result.items[3], SearchItem::Other);
    }
}
