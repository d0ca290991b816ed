//! GraphQL object types and the logic to load and create them.

use crate::api::err::{ApiResult, invalid_input};

pub(crate) mod author;
pub(crate) mod book;


/// Makes sure a required text argument is not just whitespace.
fn non_blank(field: &str, value: String) -> ApiResult<String> {
    if value.trim().is_empty() {
        return Err(invalid_input!(key = "input.blank", "'{}' must not be blank", field));
    }
    Ok(value)
}
