// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
pub use error::Error;

mod rest;
pub use rest::{QueryResource, RestQueryClient};

/// Request header bounding the size of the next page.
pub const MAX_ITEM_COUNT_HEADER: &str = "x-ms-max-item-count";

/// Request and response header carrying the continuation token.
pub const CONTINUATION_HEADER: &str = "x-ms-continuation";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct QuerySpecification {
    pub query: String,
}

impl QuerySpecification {
    pub fn new(query: impl Into<String>) -> Self {
        QuerySpecification {
            query: query.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryPage {
    pub records: Vec<serde_json::Value>,
    pub continuation: Option<String>,
}

/// One round-trip to a paged query endpoint.
#[async_trait::async_trait]
pub trait QueryTransport: Send + Sync {
    async fn query(
        &self,
        query: &QuerySpecification,
        headers: &http::HeaderMap,
    ) -> Result<QueryPage, std::io::Error>;
}

/// Runs `query` to completion or until `top` records have been collected.
///
/// Each request asks for at most the number of records still missing. Transport failures
/// are not retried.
pub async fn execute_query<T>(
    query: &QuerySpecification,
    transport: &T,
    top: Option<i64>,
) -> Result<Vec<serde_json::Value>, Error>
where
    T: QueryTransport + ?Sized,
{
    let top = match top {
        Some(top) if top <= 0 => {
            return Err(Error::InvalidArgument(
                "top",
                format!("{} is not greater than 0", top),
            ))
        }
        Some(top) => Some(
            usize::try_from(top).map_err(|err| Error::InvalidArgument("top", err.to_string()))?,
        ),
        None => None,
    };

    let mut headers = http::HeaderMap::new();
    if let Some(top) = top {
        headers.insert(MAX_ITEM_COUNT_HEADER, http::HeaderValue::from(top));
    }

    let mut records = vec![];

    loop {
        let page = transport
            .query(query, &headers)
            .await
            .map_err(Error::Client)?;

        log::debug!(
            "Query page: {} records, continuation {:?}",
            page.records.len(),
            page.continuation
        );

        if page.records.is_empty() && page.continuation.is_some() {
            return Err(Error::EmptyPage);
        }

        records.extend(page.records);

        let continuation = match page.continuation {
            Some(continuation) if top.map_or(true, |top| records.len() < top) => continuation,
            _ => break,
        };

        let continuation = http::HeaderValue::from_str(&continuation).map_err(|err| {
            Error::Client(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
        headers.insert(CONTINUATION_HEADER, continuation);

        if let Some(top) = top {
            headers.insert(MAX_ITEM_COUNT_HEADER, http::HeaderValue::from(top - records.len()));
        }
    }

    if let Some(top) = top {
        records.truncate(top);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{execute_query, Error, QueryPage, QuerySpecification, QueryTransport};

    struct Transport {
        pages: Vec<QueryPage>,
        fail: bool,
        requests: Mutex<Vec<http::HeaderMap>>,
    }

    impl Transport {
        fn new(pages: Vec<QueryPage>) -> Self {
            Transport {
                pages,
                fail: false,
                requests: Mutex::new(vec![]),
            }
        }

        /// Three pages of two records each, linked by tokens `t1` and `t2`.
        fn three_pages() -> Self {
            Transport::new(vec![
                page(&[1, 2], Some("t1")),
                page(&[3, 4], Some("t2")),
                page(&[5, 6], None),
            ])
        }

        fn headers(&self, index: usize, name: &str) -> Option<String> {
            self.requests.lock().unwrap()[index]
                .get(name)
                .map(|value| value.to_str().unwrap().to_string())
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    fn page(ids: &[i64], continuation: Option<&str>) -> QueryPage {
        QueryPage {
            records: ids.iter().map(|id| serde_json::json!({ "id": id })).collect(),
            continuation: continuation.map(ToString::to_string),
        }
    }

    #[async_trait::async_trait]
    impl QueryTransport for Transport {
        async fn query(
            &self,
            query: &QuerySpecification,
            headers: &http::HeaderMap,
        ) -> Result<QueryPage, std::io::Error> {
            assert_eq!("SELECT * FROM devices", query.query);

            let mut requests = self.requests.lock().unwrap();
            let index = requests.len();
            requests.push(headers.clone());

            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "throttled"));
            }

            Ok(self.pages[index].clone())
        }
    }

    fn query() -> QuerySpecification {
        QuerySpecification::new("SELECT * FROM devices")
    }

    #[tokio::test]
    async fn follows_continuation_tokens() {
        let transport = Transport::three_pages();

        let records = execute_query(&query(), &transport, None).await.unwrap();

        assert_eq!(6, records.len());
        assert_eq!(3, transport.calls());
        assert_eq!(None, transport.headers(0, super::CONTINUATION_HEADER));
        assert_eq!(Some("t1".to_string()), transport.headers(1, super::CONTINUATION_HEADER));
        assert_eq!(Some("t2".to_string()), transport.headers(2, super::CONTINUATION_HEADER));
        assert_eq!(None, transport.headers(2, super::MAX_ITEM_COUNT_HEADER));
    }

    #[tokio::test]
    async fn stops_at_top() {
        let transport = Transport::three_pages();

        let records = execute_query(&query(), &transport, Some(4)).await.unwrap();

        assert_eq!(
            (1..=4).map(|id| serde_json::json!({ "id": id })).collect::<Vec<_>>(),
            records
        );
        assert_eq!(2, transport.calls());
        assert_eq!(Some("4".to_string()), transport.headers(0, super::MAX_ITEM_COUNT_HEADER));
        assert_eq!(Some("2".to_string()), transport.headers(1, super::MAX_ITEM_COUNT_HEADER));
    }

    #[tokio::test]
    async fn truncates_oversized_page() {
        let transport = Transport::three_pages();

        let records = execute_query(&query(), &transport, Some(1)).await.unwrap();

        assert_eq!(vec![serde_json::json!({ "id": 1 })], records);
        assert_eq!(1, transport.calls());
    }

    #[tokio::test]
    async fn rejects_non_positive_top() {
        for top in [0, -3] {
            let transport = Transport::three_pages();

            let err = execute_query(&query(), &transport, Some(top)).await.unwrap_err();

            assert!(matches!(err, Error::InvalidArgument("top", _)), "{:?}", err);
            assert_eq!(0, transport.calls());
        }
    }

    #[tokio::test]
    async fn empty_page_with_token_is_an_error() {
        let transport = Transport::new(vec![page(&[1], Some("t1")), page(&[], Some("t2"))]);

        let err = execute_query(&query(), &transport, None).await.unwrap_err();

        assert!(matches!(err, Error::EmptyPage), "{:?}", err);
        assert_eq!(2, transport.calls());
    }

    #[tokio::test]
    async fn empty_final_page_is_fine() {
        let transport = Transport::new(vec![page(&[], None)]);

        let records = execute_query(&query(), &transport, Some(10)).await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_are_wrapped() {
        let mut transport = Transport::three_pages();
        transport.fail = true;

        let err = execute_query(&query(), &transport, None).await.unwrap_err();

        assert_eq!("query failed: throttled", err.to_string());
        assert_eq!(1, transport.calls());
    }
}
