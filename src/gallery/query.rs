//! Cursor-driven catalog search.
//!
//! A `Transport` executes exactly one page request. The `Paginator` wraps a
//! transport in an `Iterator` that requests the next page only once the
//! previous page has been fully drained, so dropping the iterator (or simply
//! not calling `next` again) is the stop signal.

use serde::Serialize;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::{debug, trace};
use url::Url;

use super::extension::{ExtensionMeta, ExtensionQueryResponse};

pub(crate) const QUERY_PATH: &str = "_apis/public/gallery/extensionquery";

/* ---- Errors ---- */

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("failed to execute request to [{url}]: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to decode response from [{url}]: {message}")]
    Decode { url: String, message: String },

    #[error("received HTTP status code [{status}] from [{url}]: {body}")]
    RemoteStatus {
        url: String,
        status: u16,
        body: String,
    },
}

/* ---- Transport seam ---- */

/// One page of results plus the cursor for the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// `None` (or empty) marks the last page.
    pub next_cursor: Option<String>,
}

/// Executes a single page request.
pub trait Transport {
    type Record;

    fn execute(&mut self, term: &str, cursor: Option<&str>)
    -> Result<Page<Self::Record>, QueryError>;
}

/* ---- Paginator ---- */

/// Lazy, forward-only sequence of search results across pages.
///
/// Yields `Err` at most once, after which the sequence ends. Restart by
/// building a new instance.
pub struct Paginator<T: Transport> {
    transport: T,
    term: String,
    cursor: Option<String>,
    buffered: VecDeque<T::Record>,
    exhausted: bool,
    requests: usize,
}

impl<T: Transport> Paginator<T> {
    pub fn new(transport: T, term: impl Into<String>) -> Self {
        Self {
            transport,
            term: term.into(),
            cursor: None,
            buffered: VecDeque::new(),
            exhausted: false,
            requests: 0,
        }
    }

    /// Number of page requests issued so far.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl<T: Transport> Iterator for Paginator<T> {
    type Item = Result<T::Record, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffered.pop_front() {
                return Some(Ok(record));
            }
            if self.exhausted {
                return None;
            }

            self.requests += 1;
            debug!(
                page = self.requests,
                cursor = self.cursor.as_deref().unwrap_or(""),
                term = %self.term,
                "requesting gallery page"
            );

            match self.transport.execute(&self.term, self.cursor.as_deref()) {
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
                Ok(page) => {
                    trace!(records = page.records.len(), "received gallery page");
                    self.cursor = page.next_cursor.filter(|c| !c.is_empty());
                    self.exhausted = self.cursor.is_none();
                    self.buffered.extend(page.records);
                }
            }
        }
    }
}

impl<T: Transport> FusedIterator for Paginator<T> {}

/* ---- Wire format ---- */

const FILTER_TYPE_PRODUCT: u8 = 8;
const FILTER_TYPE_TERM: u8 = 10;
const FILTER_TYPE_TARGET: u8 = 12;
const PRODUCT_VSCODE: &str = "Microsoft.VisualStudio.Code";
// Excludes unpublished / private entries.
const TARGET_EXCLUDE_FLAGS: &str = "37888";
const QUERY_FLAGS: u16 = 870;
const PAGE_SIZE: u16 = 20;

const ASSET_TYPES: [&str; 3] = [
    "Microsoft.VisualStudio.Services.Icons.Branding",
    "Microsoft.VisualStudio.Services.Icons.Default",
    "Microsoft.VisualStudio.Services.Icons.Small",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    asset_types: Vec<&'static str>,
    filters: Vec<QueryFilter>,
    flags: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryFilter {
    criteria: Vec<QueryFilterCriteria>,
    direction: u8,
    page_number: u16,
    page_size: u16,
    sort_by: u8,
    sort_order: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    paging_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryFilterCriteria {
    filter_type: u8,
    value: String,
}

impl QueryRequest {
    pub fn new(term: &str, cursor: Option<&str>) -> Self {
        let criteria = vec![
            QueryFilterCriteria {
                filter_type: FILTER_TYPE_PRODUCT,
                value: PRODUCT_VSCODE.to_string(),
            },
            QueryFilterCriteria {
                filter_type: FILTER_TYPE_TARGET,
                value: TARGET_EXCLUDE_FLAGS.to_string(),
            },
            QueryFilterCriteria {
                filter_type: FILTER_TYPE_TERM,
                value: term.to_string(),
            },
        ];
        Self {
            asset_types: ASSET_TYPES.to_vec(),
            filters: vec![QueryFilter {
                criteria,
                direction: 2,
                page_number: 1,
                page_size: PAGE_SIZE,
                sort_by: 0,
                sort_order: 0,
                paging_token: cursor.filter(|c| !c.is_empty()).map(str::to_string),
            }],
            flags: QUERY_FLAGS,
        }
    }
}

/// Flatten an `extensionquery` response body into one page.
pub fn decode_page(body: &str) -> Result<Page<ExtensionMeta>, serde_json::Error> {
    let response: ExtensionQueryResponse = serde_json::from_str(body)?;
    Ok(Page {
        records: response
            .results
            .into_iter()
            .flat_map(|r| r.extensions)
            .collect(),
        next_cursor: response.paging_token.filter(|t| !t.is_empty()),
    })
}

/* ---- HTTP transport ---- */

/// POSTs query pages to the gallery with a blocking client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(client: reqwest::blocking::Client, url: Url) -> Self {
        Self { client, url }
    }
}

impl Transport for HttpTransport {
    type Record = ExtensionMeta;

    fn execute(
        &mut self,
        term: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ExtensionMeta>, QueryError> {
        let url = self.url.to_string();
        let transport_err = |e: reqwest::Error| QueryError::Transport {
            url: url.clone(),
            source: Box::new(e),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&QueryRequest::new(term, cursor))
            .send()
            .map_err(transport_err)?;
        let status = response.status();
        let body = response.text().map_err(transport_err)?;

        if status.is_client_error() || status.is_server_error() {
            return Err(QueryError::RemoteStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }

        decode_page(&body).map_err(|e| QueryError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves canned pages and records every cursor it was asked for.
    struct StubTransport {
        pages: Vec<Result<Page<u32>, QueryError>>,
        seen: Vec<Option<String>>,
    }

    impl StubTransport {
        fn new(pages: Vec<Result<Page<u32>, QueryError>>) -> Self {
            Self {
                pages: pages.into_iter().rev().collect(),
                seen: Vec::new(),
            }
        }
    }

    impl Transport for StubTransport {
        type Record = u32;

        fn execute(
            &mut self,
            _term: &str,
            cursor: Option<&str>,
        ) -> Result<Page<u32>, QueryError> {
            self.seen.push(cursor.map(str::to_string));
            self.pages.pop().expect("requested a page past the last one")
        }
    }

    fn page(records: &[u32], next: Option<&str>) -> Result<Page<u32>, QueryError> {
        Ok(Page {
            records: records.to_vec(),
            next_cursor: next.map(str::to_string),
        })
    }

    fn three_pages() -> StubTransport {
        StubTransport::new(vec![
            page(&[1, 2], Some("c2")),
            page(&[3, 4], Some("c3")),
            page(&[5], None),
        ])
    }

    #[test]
    fn drains_all_pages_in_order() {
        let mut p = Paginator::new(three_pages(), "lens");
        let got: Vec<u32> = p.by_ref().map(Result::unwrap).collect();
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
        assert_eq!(p.requests(), 3);
        assert!(p.next().is_none());
        assert_eq!(
            p.transport.seen,
            vec![None, Some("c2".to_string()), Some("c3".to_string())]
        );
    }

    #[test]
    fn first_record_costs_one_request() {
        let mut p = Paginator::new(three_pages(), "lens");
        assert_eq!(p.requests(), 0, "construction is lazy");
        assert_eq!(p.next().unwrap().unwrap(), 1);
        assert_eq!(p.requests(), 1);
        // remaining records of the page are served without another request
        assert_eq!(p.next().unwrap().unwrap(), 2);
        assert_eq!(p.requests(), 1);
    }

    #[test]
    fn take_stops_requesting() {
        let mut p = Paginator::new(three_pages(), "lens");
        let got: Vec<u32> = p.by_ref().take(3).map(Result::unwrap).collect();
        assert_eq!(got, vec![1, 2, 3]);
        assert_eq!(p.requests(), 2);
    }

    #[test]
    fn error_is_yielded_once_and_ends() {
        let transport = StubTransport::new(vec![
            page(&[1], Some("c2")),
            Err(QueryError::RemoteStatus {
                url: "http://g".into(),
                status: 503,
                body: "busy".into(),
            }),
        ]);
        let mut p = Paginator::new(transport, "x");
        assert_eq!(p.next().unwrap().unwrap(), 1);
        let err = p.next().unwrap().unwrap_err();
        assert!(matches!(err, QueryError::RemoteStatus { status: 503, .. }));
        assert!(p.next().is_none());
        assert_eq!(p.requests(), 2);
    }

    #[test]
    fn empty_pages_with_cursor_are_skipped() {
        let transport = StubTransport::new(vec![
            page(&[], Some("c2")),
            page(&[7], Some("")),
        ]);
        let got: Vec<u32> = Paginator::new(transport, "x")
            .map(Result::unwrap)
            .collect();
        assert_eq!(got, vec![7]);
    }

    fn http_query(status: &'static str, body: &'static str) -> Paginator<HttpTransport> {
        let host = crate::gallery::canned::serve_once(status, body);
        crate::gallery::Gallery::new("http", &host)
            .unwrap()
            .query("lens")
            .unwrap()
    }

    #[test]
    fn http_error_status_keeps_code_and_body() {
        let mut results = http_query("503 Service Unavailable", "busy");
        match results.next().unwrap() {
            Err(QueryError::RemoteStatus { status, body, url }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
                assert!(url.ends_with("/_apis/public/gallery/extensionquery"));
            }
            other => panic!("expected RemoteStatus, got {other:?}"),
        }
        assert!(results.next().is_none());
    }

    #[test]
    fn http_non_json_body_is_a_decode_error() {
        let mut results = http_query("200 OK", "<html>maintenance</html>");
        let err = results.next().unwrap().unwrap_err();
        assert!(matches!(err, QueryError::Decode { .. }), "{err:?}");
        assert!(err.to_string().starts_with("failed to decode response from"));
    }

    #[test]
    fn http_page_decodes_records() {
        let mut results = http_query(
            "200 OK",
            r#"{"results":[{"extensions":[{"extensionName":"errorlens","publisher":{"publisherName":"usernamehw"}}]}]}"#,
        );
        let meta = results.next().unwrap().unwrap();
        assert_eq!(meta.install_with(), "usernamehw.errorlens");
        assert!(results.next().is_none(), "no paging token ends the search");
        assert_eq!(results.requests(), 1);
    }

    #[test]
    fn request_body_carries_term_and_cursor() {
        let first = serde_json::to_value(QueryRequest::new("error lens", None)).unwrap();
        let filter = &first["filters"][0];
        assert_eq!(filter["criteria"][2]["filterType"], 10);
        assert_eq!(filter["criteria"][2]["value"], "error lens");
        assert_eq!(filter["pageSize"], 20);
        assert!(filter.get("pagingToken").is_none());
        assert_eq!(first["flags"], 870);

        let next = serde_json::to_value(QueryRequest::new("x", Some("tok"))).unwrap();
        assert_eq!(next["filters"][0]["pagingToken"], "tok");
    }

    #[test]
    fn decode_page_flattens_results() {
        let page = decode_page(
            r#"{
                "results": [
                    {"extensions": [{"extensionName": "a"}, {"extensionName": "b"}]},
                    {"extensions": [{"extensionName": "c"}]}
                ],
                "pagingToken": "next"
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = page.records.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(page.next_cursor.as_deref(), Some("next"));

        let last = decode_page(r#"{"results": [], "pagingToken": ""}"#).unwrap();
        assert!(last.records.is_empty());
        assert_eq!(last.next_cursor, None);

        assert!(decode_page("<html>").is_err());
    }
}
