//! Server-rendered pages.

use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::model::{Author, Book, BookListing, SortBy};

pub struct IndexView<'a> {
    pub books: &'a [BookListing],
    pub sort_by: SortBy,
    pub search: Option<&'a str>,
    /// False only when a search matched nothing.
    pub success: bool,
    pub deleted: bool,
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " · Library" }
            }
            body {
                nav {
                    a href="/" { "Books" } " | "
                    a href="/add_author" { "Add author" } " | "
                    a href="/add_book" { "Add book" }
                }
                h1 { (title) }
                (body)
            }
        }
    }
}

fn notice(message: &str) -> Markup {
    html! { p class="notice" { (message) } }
}

pub fn index(view: &IndexView) -> Markup {
    let body = html! {
        @if view.deleted {
            (notice("Book deleted successfully."))
        }

        form method="get" action="/" {
            input type="search" name="search" placeholder="Search titles" value=[view.search];
            button type="submit" { "Search" }
        }

        form method="get" action="/" {
            label for="sort_by" { "Sort by " }
            select id="sort_by" name="sort_by" {
                @for sort in SortBy::all() {
                    option value=(sort.as_str()) selected[sort == view.sort_by] { (sort.as_str()) }
                }
            }
            button type="submit" { "Sort" }
        }

        @if !view.success {
            (notice("No books found matching your search."))
        }

        @if !view.books.is_empty() {
            table {
                thead {
                    tr {
                        th { "Title" }
                        th { "Author" }
                        th { "Year" }
                        th { "ISBN" }
                        th {}
                    }
                }
                tbody {
                    @for listing in view.books {
                        tr {
                            td { a href={ "/book/" (listing.book.id) } { (listing.book.title) } }
                            td { (listing.author_name.as_deref().unwrap_or("unknown author")) }
                            td { @if let Some(year) = listing.book.publication_year { (year) } }
                            td { @if let Some(isbn) = listing.book.isbn { (isbn) } }
                            td {
                                form method="post" action={ "/book/" (listing.book.id) "/delete" } {
                                    button type="submit" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    layout("Books", body)
}

pub fn add_author(success: bool, deleted: bool) -> Markup {
    let body = html! {
        @if success {
            (notice("Author added successfully."))
        }
        @if deleted {
            (notice("Author deleted successfully."))
        }

        form method="post" action="/add_author" {
            p {
                label for="name" { "Name" }
                input id="name" type="text" name="name" required;
            }
            p {
                label for="birth_date" { "Birth date" }
                input id="birth_date" type="date" name="birth_date";
            }
            p {
                label for="death_date" { "Death date" }
                input id="death_date" type="date" name="death_date";
            }
            button type="submit" { "Add author" }
        }
    };

    layout("Add author", body)
}

pub fn add_book(authors: &[Author], success: bool) -> Markup {
    let body = html! {
        @if success {
            (notice("Book added successfully."))
        }

        @if authors.is_empty() {
            p { "There are no authors yet. " a href="/add_author" { "Add one first." } }
        } @else {
            form method="post" action="/add_book" {
                p {
                    label for="title" { "Title" }
                    input id="title" type="text" name="title" required;
                }
                p {
                    label for="author_id" { "Author" }
                    select id="author_id" name="author_id" {
                        @for author in authors {
                            option value=(author.id) { (author.to_string()) }
                        }
                    }
                }
                p {
                    label for="publication_year" { "Publication year" }
                    input id="publication_year" type="number" name="publication_year";
                }
                p {
                    label for="isbn" { "ISBN" }
                    input id="isbn" type="text" name="isbn" inputmode="numeric";
                }
                button type="submit" { "Add book" }
            }
        }
    };

    layout("Add book", body)
}

pub fn book_detail(book: &Book, author: Option<&Author>) -> Markup {
    let body = html! {
        dl {
            dt { "Title" } dd { (book.title) }
            dt { "Author" }
            dd {
                @match author {
                    Some(author) => { (author.to_string()) }
                    None => { "unknown author" }
                }
            }
            @if let Some(year) = book.publication_year {
                dt { "Published" } dd { (year) }
            }
            @if let Some(isbn) = book.isbn {
                dt { "ISBN" } dd { (isbn) }
            }
        }
        form method="post" action={ "/book/" (book.id) "/delete" } {
            button type="submit" { "Delete" }
        }
    };

    layout(&book.to_string(), body)
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(
        title,
        html! {
            p { (message) }
            p { a href="/" { "Back to the catalog" } }
        },
    )
}
