//! Pager implementations
//!
//! Pull-style paginators: each `next_page` call issues one retry-wrapped
//! request inside a named timer and returns the page plus its continuation
//! cursor, or `None` once the sequence is exhausted.

use super::types::{Batch, Cursor};
use crate::error::Result;
use crate::http::{timed, SquareClient};
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use url::Url;

/// How a v2 endpoint receives its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStyle {
    /// POST with the parameter map as the JSON body (search endpoints)
    JsonBody,
    /// GET with the parameter map flattened into the query string
    Query,
}

/// v2 paginator: opaque cursor carried in the request/response body.
///
/// The request body stays stable across the paging sequence; the only
/// mutation between pages is inserting the new cursor.
pub struct BodyCursorPager<'a> {
    client: &'a SquareClient,
    timer_label: String,
    path: String,
    style: RequestStyle,
    body: Map<String, Value>,
    body_key: &'static str,
    cursor: Cursor,
}

impl<'a> BodyCursorPager<'a> {
    /// Build a pager. A non-empty `cursor` key already present in `body` is
    /// taken as the resume point and will be sent on the very first request.
    pub(crate) fn new(
        client: &'a SquareClient,
        timer_label: impl Into<String>,
        path: impl Into<String>,
        style: RequestStyle,
        mut body: Map<String, Value>,
        body_key: &'static str,
    ) -> Self {
        let cursor = Cursor::resume(
            body.remove("cursor")
                .and_then(|v| v.as_str().map(str::to_string)),
        );

        Self {
            client,
            timer_label: timer_label.into(),
            path: path.into(),
            style,
            body,
            body_key,
            cursor,
        }
    }

    /// Fetch the next page, or `None` once the server stops returning a
    /// cursor. Always yields at least one page.
    pub async fn next_page(&mut self) -> Result<Option<Batch>> {
        match &self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Resuming(token) => {
                self.body
                    .insert("cursor".to_string(), Value::String(token.clone()));
            }
            Cursor::NotStarted => {}
        }

        let label = format!("GET {}", self.timer_label);
        let response = timed(&label, async {
            match self.style {
                RequestStyle::JsonBody => {
                    self.client
                        .post_json(&self.path, &Value::Object(self.body.clone()))
                        .await
                }
                RequestStyle::Query => {
                    self.client
                        .get_json(&self.path, &to_query_pairs(&self.body))
                        .await
                }
            }
        })
        .await?;

        let next = response
            .get("cursor")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let records = response
            .get(self.body_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        self.cursor = Cursor::advance(next.as_deref());
        Ok(Some(Batch {
            records,
            cursor: next,
        }))
    }
}

/// v1 paginator: continuation token parsed out of the response `link`
/// header. Requests are plain authenticated GETs; the token is merged into
/// the query on every page after the first.
pub struct BatchTokenPager<'a> {
    client: &'a SquareClient,
    timer_label: String,
    path: String,
    params: Vec<(String, String)>,
    cursor: Cursor,
}

impl<'a> BatchTokenPager<'a> {
    pub(crate) fn new(
        client: &'a SquareClient,
        timer_label: impl Into<String>,
        path: impl Into<String>,
        params: Vec<(String, String)>,
        bookmarked_cursor: Option<String>,
    ) -> Self {
        Self {
            client,
            timer_label: timer_label.into(),
            path: path.into(),
            params,
            cursor: Cursor::resume(bookmarked_cursor),
        }
    }

    /// Fetch the next page, or `None` once the `link` header disappears
    pub async fn next_page(&mut self) -> Result<Option<Batch>> {
        match &self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Resuming(token) => {
                let token = token.clone();
                self.params.retain(|(k, _)| k != "batch_token");
                self.params.push(("batch_token".to_string(), token));
            }
            Cursor::NotStarted => {}
        }

        let label = format!("GET {}", self.timer_label);
        let (body, headers) = timed(label.as_str(), async {
            self.client.get_with_headers(&self.path, &self.params).await
        })
        .await?;

        let next = get_batch_token_from_headers(&headers);
        let records = body.as_array().cloned().unwrap_or_default();

        self.cursor = Cursor::advance(next.as_deref());
        Ok(Some(Batch {
            records,
            cursor: next,
        }))
    }
}

/// Pull the `batch_token` query parameter out of the first link in a
/// response `link` header. Absence of the header, the link, or the
/// parameter all mean the pagination is over.
pub fn get_batch_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let link = headers.get("link")?.to_str().ok()?;
    let url = first_link_url(link)?;
    let parsed = Url::parse(&url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "batch_token")
        .map(|(_, value)| value.into_owned())
}

/// Extract the URL of the first RFC 8288-style link in a header value:
/// `<url>; rel="next", <url>; rel="prev"`
fn first_link_url(header: &str) -> Option<String> {
    let part = header.split(',').next()?;
    let segment = part.split(';').next()?.trim();
    if segment.len() >= 2 && segment.starts_with('<') && segment.ends_with('>') {
        Some(segment[1..segment.len() - 1].to_string())
    } else {
        None
    }
}

/// Flatten a body map into query pairs; non-string scalars are rendered
/// with their JSON form
fn to_query_pairs(body: &Map<String, Value>) -> Vec<(String, String)> {
    body.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}
