use std::{fmt, str::FromStr};

use bytes::BytesMut;
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};


/// Our primary ID type, which we call "key". Every stored record gets one
/// assigned by the store when it is created. In the database, it's a `bigint`
/// (`i64`), but we have a separate Rust type for it so that it cannot be mixed
/// up with other integers (e.g. an author's age). Implements `ToSql` and
/// `FromSql` by casting to/from `i64`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Key(pub(crate) u64);

impl Key {
    /// Returns the key directly following this one. Fixture keys are capped
    /// at `i64::MAX`, so this does not overflow for keys handed out by a store.
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl FromStr for Key {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl ToSql for Key {
    fn to_sql(
        &self,
        ty: &postgres_types::Type,
        out: &mut BytesMut,
    ) -> Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        (self.0 as i64).to_sql(ty, out)
    }

    fn accepts(ty: &postgres_types::Type) -> bool {
        <i64 as ToSql>::accepts(ty)
    }

    postgres_types::to_sql_checked!();
}

impl<'a> FromSql<'a> for Key {
    fn from_sql(
        ty: &postgres_types::Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        i64::from_sql(ty, raw).map(|i| Key(i as u64))
    }

    fn accepts(ty: &postgres_types::Type) -> bool {
        <i64 as FromSql>::accepts(ty)
    }
}
