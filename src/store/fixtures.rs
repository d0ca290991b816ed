//! Fixture datasets: a fixed list of authors and books, read from YAML.

use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;

use crate::{model::{Author, Book}, prelude::*};


/// The dataset used if no fixture file is configured.
const BUILTIN: &str = include_str!("fixtures.yaml");

const MAX_KEY: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Fixtures {
    #[serde(default)]
    pub(crate) authors: Vec<Author>,

    #[serde(default)]
    pub(crate) books: Vec<Book>,
}

impl Fixtures {
    /// Loads the fixtures from the given YAML file, or the built-in ones if
    /// `path` is `None`.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => {
                debug!("Using built-in fixtures");
                Self::from_yaml(BUILTIN).context("built-in fixtures are invalid")
            }
            Some(path) => {
                info!("Loading fixtures from '{}'", path.display());
                let src = fs::read_to_string(path)
                    .with_context(|| format!("failed to read fixture file '{}'", path.display()))?;
                Self::from_yaml(&src)
                    .with_context(|| format!("invalid fixture file '{}'", path.display()))
            }
        }
    }

    pub(crate) fn from_yaml(src: &str) -> Result<Self> {
        let out: Self = serde_yaml::from_str(src)?;
        out.validate()?;
        Ok(out)
    }

    fn validate(&self) -> Result<()> {
        // Keys are stored as `bigint`. Staying in that range also leaves room
        // for the fresh keys a writable store hands out after the largest one.
        let too_large = self.authors.iter().map(|a| a.key)
            .chain(self.books.iter().map(|b| b.key))
            .find(|key| key.0 > MAX_KEY);
        if let Some(key) = too_large {
            bail!("ID {key} is too large (maximum is {MAX_KEY})");
        }

        let mut author_keys = HashSet::new();
        for author in &self.authors {
            if !author_keys.insert(author.key) {
                bail!("duplicate author ID {}", author.key);
            }
            if author.age < 0 {
                bail!("author '{}' has a negative age", author.name);
            }
        }

        let mut book_keys = HashSet::new();
        for book in &self.books {
            if !book_keys.insert(book.key) {
                bail!("duplicate book ID {}", book.key);
            }
            if !author_keys.contains(&book.author) {
                debug!("Book '{}' references non-existent author {}", book.title, book.author);
            }
        }

        Ok(())
    }
}
