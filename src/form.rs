//! Boundary between raw request input and the store's typed records.
//!
//! Every form field arrives as an optional string. Values are trimmed here and
//! blank values become `None`; nothing past this module sees an empty string
//! standing in for "no value".

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{CatalogError, Result};
use crate::model::{BookQuery, DATE_FORMAT, NewAuthor, NewBook, SortBy};

#[derive(Debug, Default, Deserialize)]
pub struct AuthorForm {
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookForm {
    pub title: Option<String>,
    pub author_id: Option<String>,
    pub publication_year: Option<String>,
    pub isbn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub sort_by: Option<String>,
    pub search: Option<String>,
    pub deleted: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FlashParams {
    pub success: Option<String>,
    pub deleted: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Display flags only switch on for a literal "true"; anything else is off.
fn flag(value: Option<&str>) -> bool {
    value.map(str::trim) == Some("true")
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    clean(value).ok_or_else(|| CatalogError::Validation(format!("{} is required", field)))
}

fn parse_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>> {
    clean(value)
        .map(|v| {
            NaiveDate::parse_from_str(&v, DATE_FORMAT)
                .map_err(|_| CatalogError::Validation(format!("{} must be a YYYY-MM-DD date, got {:?}", field, v)))
        })
        .transpose()
}

fn parse_year(value: Option<String>) -> Result<Option<i32>> {
    clean(value)
        .map(|v| {
            v.parse::<i32>()
                .map_err(|_| CatalogError::Validation(format!("publication_year must be a year, got {:?}", v)))
        })
        .transpose()
}

// Hyphens and spaces are accepted as separators; no checksum is verified.
fn parse_isbn(value: Option<String>) -> Result<Option<i64>> {
    clean(value)
        .map(|v| {
            let digits: String = v.chars().filter(|c| *c != '-' && *c != ' ').collect();
            digits
                .parse::<u64>()
                .ok()
                .and_then(|n| i64::try_from(n).ok())
                .ok_or_else(|| CatalogError::Validation(format!("isbn must be numeric, got {:?}", v)))
        })
        .transpose()
}

impl AuthorForm {
    pub fn into_new_author(self) -> Result<NewAuthor> {
        Ok(NewAuthor {
            name: required(self.name, "name")?,
            birth_date: parse_date(self.birth_date, "birth_date")?,
            death_date: parse_date(self.death_date, "death_date")?,
        })
    }
}

impl BookForm {
    pub fn into_new_book(self) -> Result<NewBook> {
        let title = required(self.title, "title")?;
        let raw_author_id = required(self.author_id, "author_id")?;
        let author_id = raw_author_id
            .parse::<i64>()
            .map_err(|_| CatalogError::Validation(format!("author_id must be an integer, got {:?}", raw_author_id)))?;

        Ok(NewBook {
            title,
            author_id,
            publication_year: parse_year(self.publication_year)?,
            isbn: parse_isbn(self.isbn)?,
        })
    }
}

impl FlashParams {
    pub fn is_success(&self) -> bool {
        flag(self.success.as_deref())
    }

    pub fn is_deleted(&self) -> bool {
        flag(self.deleted.as_deref())
    }
}

impl IndexParams {
    pub fn is_deleted(&self) -> bool {
        flag(self.deleted.as_deref())
    }

    /// A search term overrides any requested ordering; results come back by title.
    pub fn into_book_query(self) -> BookQuery {
        let search = clean(self.search);
        let sort_by = match search {
            Some(_) => SortBy::Title,
            None => SortBy::parse(self.sort_by.as_deref()),
        };

        BookQuery { sort_by, search }
    }
}
