//! Per-resource stream extractors
//!
//! One constructor per resource family. Each builds the endpoint's exact
//! filter/sort/time-window parameters and hands the paging loop to
//! `pagination`. Windowed GET streams fix `end_time = now()` once at
//! construction so records arriving during a long sync never re-enter the
//! same page sequence.

use crate::error::{Error, Result};
use crate::http::SquareClient;
use crate::pagination::{BodyCursorPager, RequestStyle};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};


/// Format used for computed window bounds (second precision)
const END_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Shift an RFC 3339 timestamp back by one millisecond, rendered with
/// microsecond precision. Endpoints whose `begin_time` is exclusive
/// server-side would otherwise skip a record sitting exactly on the bound.
pub fn shift_back_millis(timestamp: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(timestamp).map_err(|e| Error::Timestamp {
        value: timestamp.to_string(),
        message: e.to_string(),
    })?;
    let shifted = parsed.with_timezone(&Utc) - Duration::milliseconds(1);
    Ok(shifted.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}

/// Upper window bound for the current run, computed once per paging
/// sequence (second precision)
pub fn current_window_end() -> String {
    Utc::now().format(END_TIME_FORMAT).to_string()
}

fn object_body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn with_bookmark(mut body: Map<String, Value>, bookmarked_cursor: Option<String>) -> Map<String, Value> {
    if let Some(cursor) = bookmarked_cursor {
        body.insert("cursor".to_string(), Value::String(cursor));
    }
    body
}

impl SquareClient {
    /// Catalog objects of one type, updated since `start_time` (inclusive;
    /// the server's `begin_time` is exclusive, hence the 1 ms shift)
    pub fn catalog(&self, object_type: &str, start_time: &str) -> Result<BodyCursorPager<'_>> {
        let begin_time = shift_back_millis(start_time)?;
        let body = object_body(json!({
            "object_types": [object_type],
            "include_deleted_objects": true,
            "begin_time": begin_time,
        }));

        Ok(BodyCursorPager::new(
            self,
            object_type,
            "/v2/catalog/search",
            RequestStyle::JsonBody,
            body,
            "objects",
        ))
    }

    /// All locations; full-table, no filter
    pub fn locations(&self) -> BodyCursorPager<'_> {
        BodyCursorPager::new(
            self,
            "locations",
            "/v2/locations",
            RequestStyle::Query,
            Map::new(),
            "locations",
        )
    }

    /// All bank accounts; full-table, no filter
    pub fn bank_accounts(&self) -> BodyCursorPager<'_> {
        BodyCursorPager::new(
            self,
            "bank_accounts",
            "/v2/bank-accounts",
            RequestStyle::Query,
            Map::new(),
            "bank_accounts",
        )
    }

    /// Customers updated inside [start_time, end_time). Both bounds pass
    /// through unmodified; the endpoint's own contract makes the end
    /// exclusive.
    pub fn customers(&self, start_time: &str, end_time: &str) -> BodyCursorPager<'_> {
        let body = object_body(json!({
            "query": {
                "filter": {
                    "updated_at": {
                        "start_at": start_time,
                        "end_at": end_time,
                    }
                },
                "sort": {
                    "field": "CREATED_AT",
                    "order": "ASC",
                }
            }
        }));

        BodyCursorPager::new(
            self,
            "customers",
            "/v2/customers/search",
            RequestStyle::JsonBody,
            body,
            "customers",
        )
    }

    /// Orders across the given locations, updated since `start_time`,
    /// ascending by update time
    pub fn orders(&self, location_ids: &[String], start_time: &str) -> BodyCursorPager<'_> {
        let body = object_body(json!({
            "location_ids": location_ids,
            "query": {
                "filter": {
                    "date_time_filter": {
                        "updated_at": {
                            "start_at": start_time,
                        }
                    }
                },
                "sort": {
                    "sort_field": "UPDATED_AT",
                    "sort_order": "ASC",
                }
            }
        }));

        BodyCursorPager::new(
            self,
            "orders",
            "/v2/orders/search",
            RequestStyle::JsonBody,
            body,
            "orders",
        )
    }

    /// Team members assigned to the given locations
    pub fn team_members(&self, location_ids: &[String]) -> BodyCursorPager<'_> {
        let body = object_body(json!({
            "query": {
                "filter": {
                    "location_ids": location_ids,
                }
            },
            "limit": 200,
        }));

        BodyCursorPager::new(
            self,
            "team_members",
            "/v2/team-members/search",
            RequestStyle::JsonBody,
            body,
            "team_members",
        )
    }

    /// Inventory counts changed after `start_time`
    pub fn inventory(
        &self,
        start_time: &str,
        bookmarked_cursor: Option<String>,
    ) -> BodyCursorPager<'_> {
        let body = with_bookmark(
            object_body(json!({ "updated_after": start_time })),
            bookmarked_cursor,
        );

        BodyCursorPager::new(
            self,
            "inventories",
            "/v2/inventory/counts/batch-retrieve",
            RequestStyle::JsonBody,
            body,
            "counts",
        )
    }

    /// Labor shifts, ascending by update time
    pub fn shifts(&self, bookmarked_cursor: Option<String>) -> BodyCursorPager<'_> {
        let body = with_bookmark(
            object_body(json!({
                "query": {
                    "sort": {
                        "field": "UPDATED_AT",
                        "order": "ASC",
                    }
                }
            })),
            bookmarked_cursor,
        );

        BodyCursorPager::new(
            self,
            "shifts",
            "/v2/labor/shifts/search",
            RequestStyle::JsonBody,
            body,
            "shifts",
        )
    }

    /// Loyalty accounts
    pub fn loyalty_accounts(&self, bookmarked_cursor: Option<String>) -> BodyCursorPager<'_> {
        let body = with_bookmark(object_body(json!({ "limit": 200 })), bookmarked_cursor);

        BodyCursorPager::new(
            self,
            "loyalty_accounts",
            "/v2/loyalty/accounts/search",
            RequestStyle::JsonBody,
            body,
            "loyalty_accounts",
        )
    }

    /// Payment refunds created since `start_time` (exclusive bound, shifted)
    pub fn refunds(
        &self,
        start_time: &str,
        bookmarked_cursor: Option<String>,
    ) -> Result<BodyCursorPager<'_>> {
        let begin_time = shift_back_millis(start_time)?;
        let body = with_bookmark(
            object_body(json!({ "begin_time": begin_time })),
            bookmarked_cursor,
        );

        Ok(BodyCursorPager::new(
            self,
            "refunds",
            "/v2/refunds",
            RequestStyle::Query,
            body,
            "refunds",
        ))
    }

    /// Payments at one location inside [start_time, now]
    pub fn payments(
        &self,
        location_id: &str,
        start_time: &str,
        bookmarked_cursor: Option<String>,
    ) -> BodyCursorPager<'_> {
        let body = with_bookmark(
            object_body(json!({
                "location_id": location_id,
                "begin_time": start_time,
                "end_time": current_window_end(),
                "limit": 100,
            })),
            bookmarked_cursor,
        );

        BodyCursorPager::new(
            self,
            "payments",
            "/v2/payments",
            RequestStyle::Query,
            body,
            "payments",
        )
    }

    /// Cash drawer shifts at one location inside [start_time, now]
    pub fn cash_drawer_shifts(
        &self,
        location_id: &str,
        start_time: &str,
        bookmarked_cursor: Option<String>,
    ) -> BodyCursorPager<'_> {
        let body = with_bookmark(
            object_body(json!({
                "location_id": location_id,
                "begin_time": start_time,
                "end_time": current_window_end(),
                "limit": 1000,
            })),
            bookmarked_cursor,
        );

        // The records come back under "items", not the resource name
        BodyCursorPager::new(
            self,
            "cash drawer shifts",
            "/v2/cash-drawers/shifts",
            RequestStyle::Query,
            body,
            "items",
        )
    }

    /// Payouts to one location inside [start_time, now]
    pub fn payouts(
        &self,
        location_id: &str,
        start_time: &str,
        bookmarked_cursor: Option<String>,
    ) -> BodyCursorPager<'_> {
        let body = with_bookmark(
            object_body(json!({
                "location_id": location_id,
                "begin_time": start_time,
                "end_time": current_window_end(),
                "limit": 100,
            })),
            bookmarked_cursor,
        );

        BodyCursorPager::new(
            self,
            "payouts details",
            "/v2/payouts",
            RequestStyle::Query,
            body,
            "payouts",
        )
    }
}
