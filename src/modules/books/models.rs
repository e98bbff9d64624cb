use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use shelf_http::AppError;

pub const MISSING_ATTRIBUTES: &str = "missing attributes in request";
pub const MISSING_ID: &str = "missing \"id\" attribute in request";
pub const MISSING_ISBN: &str = "missing \"isbn\" attribute in request";

/// A persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Storage-assigned identifier
    pub id: i64,
    pub name: String,
    pub author: String,
    pub category: String,
    pub publication_year: i64,
    /// Alternate lookup key; not unique in storage
    pub isbn: String,
}

/// Every business field of a book, validated as present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub name: String,
    pub author: String,
    pub category: String,
    pub publication_year: i64,
    pub isbn: String,
}

/// Fields rewritten by an update matched on ISBN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    pub name: String,
    pub author: String,
    pub category: String,
    pub publication_year: i64,
}

/// Raw request body for create, update and delete.
///
/// Every field is optional so that absence is reported as a 400 with a
/// stable message instead of a deserializer error. Empty strings and zero
/// numbers count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub publication_year: Option<i64>,
    #[serde(default)]
    pub isbn: Option<String>,
}

impl BookPayload {
    /// Body of a create request.
    pub fn into_new_book(self) -> Result<NewBook, AppError> {
        let missing = || AppError::validation(MISSING_ATTRIBUTES);
        Ok(NewBook {
            name: text(self.name).ok_or_else(missing)?,
            author: text(self.author).ok_or_else(missing)?,
            category: text(self.category).ok_or_else(missing)?,
            publication_year: number(self.publication_year).ok_or_else(missing)?,
            isbn: text(self.isbn).ok_or_else(missing)?,
        })
    }

    /// Body of an update-by-id request: the target id plus a full replacement.
    pub fn into_replacement(self) -> Result<(i64, NewBook), AppError> {
        let id = number(self.id).ok_or_else(|| AppError::validation(MISSING_ATTRIBUTES))?;
        let book = self.into_new_book()?;
        Ok((id, book))
    }

    /// Body of an update-by-ISBN request. A body `isbn` is ignored.
    pub fn into_details(self) -> Result<BookDetails, AppError> {
        let missing = || AppError::validation(MISSING_ATTRIBUTES);
        Ok(BookDetails {
            name: text(self.name).ok_or_else(missing)?,
            author: text(self.author).ok_or_else(missing)?,
            category: text(self.category).ok_or_else(missing)?,
            publication_year: number(self.publication_year).ok_or_else(missing)?,
        })
    }

    /// The `id` of a delete-by-id request.
    pub fn require_id(&self) -> Result<i64, AppError> {
        number(self.id).ok_or_else(|| AppError::validation(MISSING_ID))
    }
}

/// Response of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedId {
    pub inserted_id: i64,
}

/// Response of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    pub deleted_count: u64,
}

/// Response of a successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedCount {
    pub updated_count: u64,
}

fn text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn number(value: Option<i64>) -> Option<i64> {
    value.filter(|n| *n != 0)
}

/// Parse a path segment that must hold a record id.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation(MISSING_ID));
    }
    raw.parse()
        .map_err(|_| AppError::validation(format!("invalid \"id\" attribute in request: '{raw}'")))
}

/// Accepts `1965`, `"1965"` or `null`; a blank string reads as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(n)) => Ok(Some(n)),
        Some(IntOrString::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(IntOrString::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, found '{s}'"))),
    }
}
