//! Items that define the domain data model.
//!
//! These are the records as the entity store hands them out. The GraphQL
//! object types in `api::model` are implemented directly on these types, so
//! a resolver always receives exactly what the store produced for its parent.

use serde::Deserialize;

mod key;

pub(crate) use self::key::Key;


/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Book {
    #[serde(rename = "id")]
    pub(crate) key: Key,
    pub(crate) title: String,
    pub(crate) genre: Option<String>,

    /// The author of this book. Never checked to exist: this might dangle.
    pub(crate) author: Key,
}

/// An author of books.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Author {
    #[serde(rename = "id")]
    pub(crate) key: Key,
    pub(crate) name: String,
    pub(crate) age: i32,
}

/// Data for a book that is about to be created. The key is assigned by the
/// store.
#[derive(Debug, Clone)]
pub(crate) struct NewBook {
    pub(crate) title: String,
    pub(crate) genre: Option<String>,
    pub(crate) author: Key,
}

/// Data for an author that is about to be created.
#[derive(Debug, Clone)]
pub(crate) struct NewAuthor {
    pub(crate) name: String,
    pub(crate) age: i32,
}

impl NewBook {
    pub(crate) fn into_book(self, key: Key) -> Book {
        Book { key, title: self.title, genre: self.genre, author: self.author }
    }
}

impl NewAuthor {
    pub(crate) fn into_author(self, key: Key) -> Author {
        Author { key, name: self.name, age: self.age }
    }
}
