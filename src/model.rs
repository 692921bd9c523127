use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub publication_year: Option<i32>,
    pub isbn: Option<i64>,
}

/// A book row as shown in listings, carrying its author's name.
/// `author_name` is `None` for a book whose author row is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookListing {
    pub book: Book,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author_id: i64,
    pub publication_year: Option<i32>,
    pub isbn: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Title,
    Author,
    PublicationYear,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::Author => "author",
            SortBy::PublicationYear => "publication_year",
        }
    }

    /// Unknown or missing values fall back to title ordering.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("author") => SortBy::Author,
            Some("publication_year") => SortBy::PublicationYear,
            _ => SortBy::Title,
        }
    }

    pub fn all() -> [SortBy; 3] {
        [SortBy::Title, SortBy::Author, SortBy::PublicationYear]
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub sort_by: SortBy,
    pub search: Option<String>,
}

fn format_date(date: &Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let birth = format_date(&self.birth_date);
        let death = format_date(&self.death_date);

        if birth.is_empty() && death.is_empty() {
            return write!(f, "{}. {}", self.id, self.name);
        }

        let full = format!("{}. {} ({} - {})", self.id, self.name, birth, death);
        write!(f, "{}", full.trim_matches(|c| c == ' ' || c == '-'))
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.publication_year {
            Some(year) => write!(f, "{}. {} ({})", self.id, self.title, year),
            None => write!(f, "{}. {}", self.id, self.title),
        }
    }
}
