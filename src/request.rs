//! Request construction and identity derivation.
//!
//! This module turns a query (raw text or an already-parsed document), a
//! variables value, and an optional fragment map into an immutable
//! [`Request`] carrying a deterministic [`RequestKey`]. The key is the sole
//! identity used for deduplication and subscription lifecycle decisions:
//! two requests with a structurally equal document and deep-equal variables
//! always produce the same key, no matter how the source text was formatted
//! or in which order variable object keys were supplied.
//!
//! Construction is pure. Nothing here subscribes, caches, or talks to an
//! engine; the single-slot identity cache lives in [`cell`].

pub mod cell;

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use graphql_parser::query::{Definition, Document};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::RequestError;

/// A parsed, owned GraphQL executable document.
pub type QueryDocument = Document<'static, String>;

/// A query supplied either as raw text or as a pre-parsed document.
///
/// Raw text is parsed on demand; a parse failure surfaces as
/// [`RequestError::Parse`] from whichever operation triggered it.
#[derive(Debug, Clone)]
pub enum QuerySource {
    /// Raw GraphQL text, parsed during request construction.
    Text(String),
    /// An already-parsed document, used as-is.
    Document(QueryDocument),
}

impl QuerySource {
    /// Resolves this source into a parsed document, consuming the source.
    pub fn into_document(self) -> Result<QueryDocument, RequestError> {
        match self {
            Self::Text(text) => parse_document(&text),
            Self::Document(document) => Ok(document),
        }
    }

    /// Resolves this source into a parsed document without consuming it.
    pub fn to_document(&self) -> Result<QueryDocument, RequestError> {
        match self {
            Self::Text(text) => parse_document(text),
            Self::Document(document) => Ok(document.clone()),
        }
    }
}

impl From<&str> for QuerySource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for QuerySource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<QueryDocument> for QuerySource {
    fn from(document: QueryDocument) -> Self {
        Self::Document(document)
    }
}

/// Named fragment bodies to append to a query's definition list.
///
/// Iteration order is insertion order, and it is also the append order.
/// Each entry's declared fragment name is overwritten with its map key, so
/// queries reference fragments by logical name regardless of how the body
/// declares itself.
pub type FragmentMap = IndexMap<String, QuerySource>;

/// Deterministic fingerprint of a `(query, variables)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(u64);

impl RequestKey {
    /// Returns the raw key value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// An immutable, keyed query request.
///
/// Produced fresh on every derivation; promoted to "the" request for a call
/// site only by [`cell::RequestCell`]. Fields are never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct Request {
    key: RequestKey,
    query: QueryDocument,
    variables: Value,
}

impl Request {
    /// Builds a request from a query, optional variables, and an optional
    /// fragment map.
    ///
    /// Fragment entries are parsed independently and appended after the
    /// query's own definitions, in map order, with their names overwritten
    /// by the map key. Variables default to an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] if the query or a fragment body fails to
    /// parse, or if a fragment entry does not hold a fragment definition.
    pub fn new(
        query: impl Into<QuerySource>,
        variables: Option<Value>,
        fragments: Option<&FragmentMap>,
    ) -> Result<Self, RequestError> {
        let mut document = query.into().into_document()?;
        if let Some(fragments) = fragments {
            document = include_fragments(document, fragments)?;
        }

        let variables = variables.unwrap_or_else(|| Value::Object(Map::new()));
        let key = compute_key(&document, &variables);

        Ok(Self {
            key,
            query: document,
            variables,
        })
    }

    /// The request's fingerprint.
    #[must_use]
    pub const fn key(&self) -> RequestKey {
        self.key
    }

    /// The parsed document, with fragments inlined.
    #[must_use]
    pub const fn query(&self) -> &QueryDocument {
        &self.query
    }

    /// The variables value. Always an object, possibly empty.
    #[must_use]
    pub const fn variables(&self) -> &Value {
        &self.variables
    }
}

fn parse_document(text: &str) -> Result<QueryDocument, RequestError> {
    Ok(graphql_parser::parse_query::<String>(text)?.into_static())
}

/// Appends each fragment map entry to the document's definition list,
/// forcing the declared name to the map key.
fn include_fragments(
    mut document: QueryDocument,
    fragments: &FragmentMap,
) -> Result<QueryDocument, RequestError> {
    for (name, source) in fragments {
        let body = source.to_document()?;
        let mut definitions = body.definitions.into_iter();

        match definitions.next() {
            Some(Definition::Fragment(mut fragment)) => {
                fragment.name = name.clone();
                document.definitions.push(Definition::Fragment(fragment));
            }
            Some(_) => {
                return Err(RequestError::ExpectedFragment { name: name.clone() });
            }
            None => {
                return Err(RequestError::EmptyFragment { name: name.clone() });
            }
        }
    }

    Ok(document)
}

/// Combines a structural hash of the printed document with a canonical hash
/// of the variables value.
fn compute_key(document: &QueryDocument, variables: &Value) -> RequestKey {
    let mut hasher = DefaultHasher::new();
    // The printed form is canonical: structurally equal documents render
    // identically regardless of source formatting.
    document.to_string().hash(&mut hasher);
    hash_value(variables, &mut hasher);
    RequestKey(hasher.finish())
}

/// Hashes a JSON value such that deep-equal values hash identically.
///
/// Object keys are visited in sorted order, making the hash independent of
/// key insertion order. Arrays stay order-sensitive.
fn hash_value<H: Hasher>(value: &Value, hasher: &mut H) {
    match value {
        Value::Null => hasher.write_u8(0),
        Value::Bool(value) => {
            hasher.write_u8(1);
            value.hash(hasher);
        }
        Value::Number(number) => {
            hasher.write_u8(2);
            if let Some(value) = number.as_i64() {
                value.hash(hasher);
            } else if let Some(value) = number.as_u64() {
                value.hash(hasher);
            } else if let Some(value) = number.as_f64() {
                value.to_bits().hash(hasher);
            }
        }
        Value::String(value) => {
            hasher.write_u8(3);
            value.hash(hasher);
        }
        Value::Array(items) => {
            hasher.write_u8(4);
            hasher.write_u64(items.len() as u64);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            hasher.write_u8(5);
            hasher.write_u64(map.len() as u64);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for key in keys {
                key.hash(hasher);
                hash_value(&map[key], hasher);
            }
        }
    }
}
