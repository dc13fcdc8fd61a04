//! Response assembly for list and read endpoints
//!
//! A list response is a bare JSON array of records plus a `Content-Range`
//! header describing which slice of the full result set it holds.
//!
//! # Example
//!
//! ```rust
//! use relist::handlers::ResultPage;
//! use relist::model::Record;
//!
//! let page = ResultPage::new(vec![Record::new(); 10], 100, 0);
//! assert_eq!(page.content_range(), "items 0-9/100");
//! ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::model::Record;

/// Unit used in the `Content-Range` header
pub const RANGE_UNIT: &str = "items";

/// One page of a list result
///
/// The end of the range is always derived from the rows actually present,
/// so the header can never claim rows the body does not hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Records of this page, in query order
    pub rows: Vec<Record>,
    /// Total matching the request's filters, ignoring the window
    pub total_count: u64,
    /// Position of the first row in the full result set
    pub range_start: u64,
}

impl ResultPage {
    /// Create a page
    pub fn new(rows: Vec<Record>, total_count: u64, range_start: u64) -> Self {
        Self {
            rows,
            total_count,
            range_start,
        }
    }

    /// Position of the last row, or `None` for an empty page
    pub fn range_end(&self) -> Option<u64> {
        match self.rows.len() as u64 {
            0 => None,
            n => Some(self.range_start + n - 1),
        }
    }

    /// `Content-Range` value: `items {start}-{end}/{total}`
    ///
    /// An empty page has no inclusive range and renders as
    /// `items */{total}`.
    ///
    /// ```rust
    /// use relist::handlers::ResultPage;
    ///
    /// assert_eq!(ResultPage::new(Vec::new(), 12, 40).content_range(), "items */12");
    /// ```
    pub fn content_range(&self) -> String {
        match self.range_end() {
            Some(end) => format!(
                "{} {}-{}/{}",
                RANGE_UNIT, self.range_start, end, self.total_count
            ),
            None => format!("{} */{}", RANGE_UNIT, self.total_count),
        }
    }
}

impl IntoResponse for ResultPage {
    fn into_response(self) -> Response {
        let range = self.content_range();
        let mut response = (StatusCode::OK, Json(self.rows)).into_response();
        match HeaderValue::from_str(&range) {
            Ok(value) => {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Content-Range header not representable"),
        }
        response
    }
}

/// Single record response for the read endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemResponse(pub Record);

impl IntoResponse for ItemResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let mut record = Record::new();
                record.insert("id".to_string(), json!(i + 1));
                record
            })
            .collect()
    }

    #[test]
    fn test_range_end_follows_rows() {
        assert_eq!(ResultPage::new(rows(10), 100, 0).range_end(), Some(9));
        assert_eq!(ResultPage::new(rows(3), 23, 20).range_end(), Some(22));
        assert_eq!(ResultPage::new(rows(0), 23, 40).range_end(), None);
    }

    #[test]
    fn test_content_range() {
        assert_eq!(ResultPage::new(rows(10), 100, 0).content_range(), "items 0-9/100");
        assert_eq!(ResultPage::new(rows(2), 500, 0).content_range(), "items 0-1/500");
        assert_eq!(ResultPage::new(rows(0), 0, 0).content_range(), "items */0");
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = ResultPage::new(rows(2), 7, 5).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "items 5-6/7"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!([{"id": 1}, {"id": 2}]));
    }
}
