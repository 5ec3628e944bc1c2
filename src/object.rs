//! Dynamic objects materialized from Graph API payloads.
//!
//! The API returns arbitrary JSON shapes, so responses are kept as a
//! [`serde_json::Value`] tree rather than mapped onto fixed structs. A
//! [`GraphObject`] is that tree plus an optional *kind* (`"User"`,
//! `"photos"`, a query table name, ...). The kind is a label only; it never
//! changes field values. In raw-data mode objects carry no kind at all.
//!
//! The one shape the library does interpret is the error envelope:
//!
//! ```json
//! { "error": { "message": "...", "type": "OAuthException", "code": 190 } }
//! ```
//!
//! [`ApiFailure::from_value`] recognizes it, and operations that expect a
//! single object or a query result turn it into [`GraphError::Api`] before
//! returning.

use serde_json::Value;

use crate::dispatch::RequestDispatcher;
use crate::error::{GraphError, Result};
use crate::paging::PaginatedCollection;

// ── Objects ────────────────────────────────────────────────────────────

/// A node of a materialized response.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphObject {
    kind: Option<String>,
    value: Value,
}

impl GraphObject {
    /// Wraps `value` as an object of `kind`.
    pub fn new(kind: impl Into<String>, value: Value) -> Self {
        GraphObject {
            kind: Some(kind.into()),
            value,
        }
    }

    /// Wraps `value` without a kind, as raw-data mode does.
    pub fn raw(value: Value) -> Self {
        GraphObject { kind: None, value }
    }

    /// The kind this object was materialized as, if any.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Looks up a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }

    /// Looks up a top-level string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Looks up a nested value by JSON pointer, e.g. `"/paging/next"`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.value.pointer(pointer)
    }

    /// The object itself as an ordered sequence, when it is a JSON array.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        self.value.as_array().map(Vec::as_slice)
    }

    /// The underlying tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the object, returning the underlying tree.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The error envelope, if this object is one.
    pub fn failure(&self) -> Option<ApiFailure> {
        ApiFailure::from_value(&self.value)
    }

    /// Returns the object unchanged, or the API error it carries.
    ///
    /// # Errors
    ///
    /// - `GraphError::Api`: a top-level `error` field is present.
    pub fn check(self) -> Result<Self> {
        match self.failure() {
            Some(failure) => Err(failure.into()),
            None => Ok(self),
        }
    }
}

// ── Error envelope ─────────────────────────────────────────────────────

/// The contents of an `{"error": ...}` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// `error.message`, verbatim.
    pub message: String,
    /// `error.code`, when numeric.
    pub code: Option<i64>,
    /// `error.type`.
    pub error_type: Option<String>,
}

impl ApiFailure {
    /// Recognizes an error envelope by the presence of a top-level `error`
    /// field. Legacy responses sometimes send `error` as a bare string, with
    /// the details in `error_description`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let error = value.get("error")?;
        let failure = match error {
            Value::Object(fields) => ApiFailure {
                message: fields
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
                code: fields.get("code").and_then(Value::as_i64),
                error_type: fields
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            Value::String(kind) => ApiFailure {
                message: value
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or(kind.as_str())
                    .to_string(),
                code: None,
                error_type: Some(kind.clone()),
            },
            other => ApiFailure {
                message: other.to_string(),
                code: None,
                error_type: None,
            },
        };
        Some(failure)
    }
}

impl From<ApiFailure> for GraphError {
    fn from(failure: ApiFailure) -> Self {
        GraphError::Api {
            message: failure.message,
            code: failure.code,
            error_type: failure.error_type,
        }
    }
}

// ── Factory ────────────────────────────────────────────────────────────

/// Turns raw payloads into [`GraphObject`]s.
///
/// Design rationale:
/// - One factory per client, so raw-data mode is a per-client setting. A
///   process-wide switch would let one client's configuration change the
///   shape of another client's results.
/// - The factory is `Copy` and stateless apart from that flag, so paginated
///   collections borrow it rather than cloning configuration.
/// - Wrapping does not error-check. Each caller decides when an error
///   envelope is fatal: single objects via [`GraphObject::check`], pages as
///   they are fetched, query results before their rows are unpacked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectFactory {
    raw_data: bool,
}

impl ObjectFactory {
    /// A factory that tags objects with their kind unless `raw_data` is set.
    pub fn new(raw_data: bool) -> Self {
        ObjectFactory { raw_data }
    }

    /// Whether objects are returned untagged.
    pub fn raw_data(&self) -> bool {
        self.raw_data
    }

    /// Parses a JSON payload into a tree.
    ///
    /// # Errors
    ///
    /// - `GraphError::Parse`: the payload is not JSON.
    pub fn parse(&self, payload: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Wraps an already-parsed tree according to the factory's mode.
    pub fn wrap(&self, kind: &str, value: Value) -> GraphObject {
        if self.raw_data {
            GraphObject::raw(value)
        } else {
            GraphObject::new(kind, value)
        }
    }

    /// Parses `payload` and wraps it as an object of `kind`.
    ///
    /// No error check happens here; callers expecting a single object use
    /// [`GraphObject::check`].
    ///
    /// # Errors
    ///
    /// - `GraphError::Parse`: the payload is not JSON.
    pub fn make_object(&self, kind: &str, payload: &[u8]) -> Result<GraphObject> {
        let value = self.parse(payload)?;
        Ok(self.wrap(kind, value))
    }

    /// Wraps every element of `obj`'s `data` array as an object of `kind`.
    /// A missing or non-array `data` field yields no items.
    pub fn data_items(&self, obj: &GraphObject, kind: &str) -> Vec<GraphObject> {
        obj.field("data")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(|row| self.wrap(kind, row.clone())).collect())
            .unwrap_or_default()
    }

    /// Builds a lazy collection over `obj` when it carries a `paging` block.
    ///
    /// Returns `None` when `obj` is not paginated; the caller then reads
    /// `data` directly (see [`PaginatedCollection::single_page`]).
    pub fn make_paginated_collection<'a>(
        &'a self,
        obj: &GraphObject,
        kind: &str,
        dispatcher: &'a RequestDispatcher,
        access_token: Option<&str>,
    ) -> Option<PaginatedCollection<'a>> {
        if !obj.field("paging").is_some_and(Value::is_object) {
            return None;
        }
        Some(PaginatedCollection::from_first_page(
            self,
            dispatcher,
            access_token,
            kind,
            obj,
        ))
    }

    /// Parses a query result: a flat JSON array of rows, each tagged with
    /// `table`. The `{"data": [...]}` envelope of newer API versions is
    /// accepted as well.
    ///
    /// # Errors
    ///
    /// - `GraphError::Api`: the payload is an error envelope.
    /// - `GraphError::Parse`: the payload is not JSON.
    /// - `GraphError::UnexpectedResponse`: neither an array nor a `data`
    ///   envelope.
    pub fn make_object_list(&self, table: &str, payload: &[u8]) -> Result<Vec<GraphObject>> {
        let value = self.parse(payload)?;
        if let Some(failure) = ApiFailure::from_value(&value) {
            return Err(failure.into());
        }

        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(mut fields) => match fields.remove("data") {
                Some(Value::Array(rows)) => rows,
                _ => {
                    return Err(GraphError::UnexpectedResponse(
                        "query response has no row array".to_string(),
                    ));
                }
            },
            other => {
                return Err(GraphError::UnexpectedResponse(format!(
                    "query response is not a row array: {other}"
                )));
            }
        };

        Ok(rows.into_iter().map(|row| self.wrap(table, row)).collect())
    }
}
