//! Table-name extraction for the legacy query endpoint.
//!
//! Query results are tagged with the table they came from, so the table name
//! is read off the query text before the request is sent. The resolver
//! understands exactly one keyword: it finds the first case-sensitive `FROM`,
//! skips the single character after it, and takes the next
//! whitespace-delimited token.

use crate::error::{GraphError, Result};

const KEYWORD: &str = "FROM";

/// Returns the table a query selects from.
///
/// ```
/// use fbgraph::query::resolve_table_name;
///
/// assert_eq!(resolve_table_name("SELECT uid FROM user WHERE uid=1").unwrap(), "user");
/// assert!(resolve_table_name("SELECT uid").is_err());
/// ```
///
/// # Errors
///
/// - `GraphError::QuerySyntax`: `FROM` is absent or nothing follows it.
pub fn resolve_table_name(query: &str) -> Result<&str> {
    let syntax_error = || GraphError::QuerySyntax {
        query: query.to_string(),
    };

    let index = query.find(KEYWORD).ok_or_else(syntax_error)?;
    let mut rest = query[index + KEYWORD.len()..].chars();
    rest.next().ok_or_else(syntax_error)?;

    rest.as_str()
        .split_whitespace()
        .next()
        .ok_or_else(syntax_error)
}
