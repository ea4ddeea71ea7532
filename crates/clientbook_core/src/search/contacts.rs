//! SQLite FTS5-based contact search.
//!
//! # Responsibility
//! - Provide keyword search over contact name, email and company fields.
//! - Return typed hits with stable IDs.
//!
//! # Invariants
//! - Result ordering is deterministic: rank, then name, then id.
//! - Blank queries return an empty result instead of matching everything.

use crate::db::DbError;
use crate::model::contact::{ContactId, ContactType};
use crate::repo::contact_repo::parse_contact_type;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery { query: String, message: String },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<crate::repo::RepoError> for SearchError {
    fn from(value: crate::repo::RepoError) -> Self {
        match value {
            crate::repo::RepoError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Search options for contact lookup.
#[derive(Debug, Clone)]
pub struct ContactSearchQuery {
    /// User query text; terms are matched as prefixes.
    pub text: String,
    /// Optional kind filter.
    pub kind: Option<ContactType>,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as a raw FTS5 expression.
    ///
    /// Default is `false` so interactive callers never see syntax errors.
    pub raw_fts_syntax: bool,
}

impl ContactSearchQuery {
    /// Creates a query with default limit and no kind filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            limit: 20,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_contacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactHit {
    pub contact_id: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub snippet: String,
}

/// Searches contacts via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries.
pub fn search_contacts(
    conn: &Connection,
    query: &ContactSearchQuery,
) -> SearchResult<Vec<ContactHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            contacts.contact_uuid AS contact_uuid,
            contacts.full_name AS full_name,
            contacts.contact_type AS contact_type,
            snippet(contacts_fts, -1, '[', ']', ' ... ', 10) AS snippet
         FROM contacts_fts
         JOIN contacts ON contacts.rowid = contacts_fts.rowid
         WHERE contacts_fts MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(kind) = query.kind {
        sql.push_str(" AND contacts.contact_type = ?");
        bind_values.push(Value::Text(kind.as_db_str().to_string()));
    }

    sql.push_str(
        " ORDER BY bm25(contacts_fts), contacts.full_name ASC, contacts.contact_uuid ASC LIMIT ?",
    );
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_contact_hit(row)?);
    }

    Ok(hits)
}

fn parse_contact_hit(row: &Row<'_>) -> SearchResult<ContactHit> {
    let uuid_text: String = row.get("contact_uuid")?;
    let contact_id = Uuid::parse_str(&uuid_text)
        .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{uuid_text}`")))?;

    let kind_text: String = row.get("contact_type")?;

    Ok(ContactHit {
        contact_id,
        full_name: row.get("full_name")?,
        contact_type: parse_contact_type(&kind_text)?,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &ContactSearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_prefix_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

fn escape_fts_prefix_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\" *")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
