//! API error handling.
//!
//! We define our own error to use for all resolvers. It can be created from
//! store errors and via a couple of macros. Besides the message, it carries a
//! coarse "error kind" and an optional "key" that clients can match on. Both
//! end up in the `extensions` of the GraphQL error.

use juniper::{FieldError, IntoFieldError, ScalarValue, graphql_value};

use crate::{prelude::*, store::StoreError};


pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) msg: String,
    pub(crate) kind: ApiErrorKind,
    pub(crate) key: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    /// The arguments passed to an endpoint are invalid somehow. Nothing was
    /// read from or written to the store.
    InvalidInput,

    /// The entity store failed to answer. Only the field that needed the
    /// store is affected.
    StoreFailure,
}

impl ApiErrorKind {
    fn kind_str(&self) -> &str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::StoreFailure => "STORE_FAILURE",
        }
    }

    fn message_prefix(&self) -> &str {
        match self {
            Self::InvalidInput => "Invalid input",
            Self::StoreFailure => "Store failure",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(src: StoreError) -> Self {
        // This is the last point where detailed information about the error
        // is available, so we log it here.
        let key = match &src {
            StoreError::ReadOnly => {
                debug!("Rejected write to read-only store");
                Some("store.read-only")
            }
            _ => {
                error!("Store error: {src}");
                debug!("Detailed error: {src:#?}");
                None
            }
        };

        Self {
            msg: src.to_string(),
            kind: ApiErrorKind::StoreFailure,
            key,
        }
    }
}

impl<S: ScalarValue> IntoFieldError<S> for ApiError {
    fn into_field_error(self) -> FieldError<S> {
        let msg = format!("{}: {}", self.kind.message_prefix(), self.msg);
        let ext = if let Some(key) = self.key {
            graphql_value!({
                "kind": (self.kind.kind_str()),
                "key": key,
            })
        } else {
            graphql_value!({
                "kind": (self.kind.kind_str()),
            })
        };

        FieldError::new(msg, ext)
    }
}


// ===== Helper macros to easily create errors ==================================================

/// Creates an `ApiError` with a `format!` like syntax.
macro_rules! api_err {
    ($kind:ident, key = $key:literal, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::api::err::ApiError {
            msg: format!($fmt $(, $arg)*),
            kind: $crate::api::err::ApiErrorKind::$kind,
            key: Some($key),
        }
    };
    ($kind:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::api::err::ApiError {
            msg: format!($fmt $(, $arg)*),
            kind: $crate::api::err::ApiErrorKind::$kind,
            key: None,
        }
    };
}

macro_rules! invalid_input {
    ($($t:tt)+) => { $crate::api::err::api_err!(InvalidInput, $($t)*) };
}

pub(crate) use api_err;
pub(crate) use invalid_input;
