use juniper::{GraphQLScalar, InputValue, ScalarValue, Value};

use crate::model::Key;


/// An opaque identifier of a book or an author.
///
/// Books and authors are numbered independently, so the same ID may refer to
/// a book and to an author. IDs are rendered as decimal strings. As input,
/// strings and integers are accepted. Input that cannot be parsed is not an
/// error: it simply refers to no object at all. That way, clients only ever
/// see "nothing found" instead of having to distinguish between "not found"
/// and "invalid syntax".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, GraphQLScalar)]
#[graphql(
    name = "ID",
    description = "An opaque identifier of a book or author",
    parse_token(String, i32),
)]
pub(crate) struct Id(Option<Key>);

impl Id {
    /// The store key or `None` if this ID was malformed client input.
    pub(crate) fn key(&self) -> Option<Key> {
        self.0
    }

    fn to_output<S: ScalarValue>(&self) -> Value<S> {
        Value::scalar(self.0.map(|key| key.to_string()).unwrap_or_default())
    }

    fn from_input<S: ScalarValue>(input: &InputValue<S>) -> Result<Self, String> {
        if let Some(s) = input.as_string_value() {
            Ok(Self(s.trim().parse().ok()))
        } else if let Some(i) = input.as_int_value() {
            Ok(Self(u64::try_from(i).ok().map(Key)))
        } else {
            Err(format!("expected string or integer, found: {input}"))
        }
    }
}

impl From<Key> for Id {
    fn from(key: Key) -> Self {
        Self(Some(key))
    }
}
