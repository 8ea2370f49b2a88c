use serde::{Deserialize, Serialize};

use crate::domain::{LanguageId, SortDirection, SortKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Body of `POST /programming-languages/search-sort`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSortRequest {
    pub search_keyword: String,
    #[serde(rename = "sortBy", default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortKey>,
    #[serde(rename = "sortOrder", default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortDirection>,
}

impl SearchSortRequest {
    /// The order is only relayed alongside a sort column.
    pub fn new(
        search_keyword: impl Into<String>,
        sort_by: Option<SortKey>,
        direction: SortDirection,
    ) -> Self {
        Self {
            search_keyword: search_keyword.into(),
            sort_by,
            sort_order: sort_by.map(|_| direction),
        }
    }
}

/// Body of `DELETE /programming-languages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<LanguageId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_omits_order_without_column() {
        let plain = SearchSortRequest::new("py", None, SortDirection::Descending);
        assert_eq!(
            serde_json::to_value(&plain).expect("json"),
            serde_json::json!({ "search_keyword": "py" })
        );

        let sorted = SearchSortRequest::new("", Some(SortKey::ReleaseYear), SortDirection::Descending);
        assert_eq!(
            serde_json::to_value(&sorted).expect("json"),
            serde_json::json!({
                "search_keyword": "",
                "sortBy": "releaseYear",
                "sortOrder": "desc",
            })
        );
    }

    #[test]
    fn bulk_delete_serializes_plain_ids() {
        let body = BulkDeleteRequest {
            ids: vec![LanguageId(1), LanguageId(3)],
        };
        assert_eq!(
            serde_json::to_string(&body).expect("json"),
            r#"{"ids":[1,3]}"#
        );
    }
}
