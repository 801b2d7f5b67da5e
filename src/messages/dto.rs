use serde::Deserialize;
use validator::{Validate, ValidationError};

pub const SAME_USER: &str = "Invalid, messages to and from user cannot be the same user.";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "distinct_users", skip_on_field_errors = false))]
pub struct NewMessage {
    #[validate(range(min = 1))]
    pub listing_id: i32,
    #[validate(range(min = 1))]
    pub from_user_id: i32,
    #[validate(range(min = 1))]
    pub to_user_id: i32,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

fn distinct_users(new: &NewMessage) -> Result<(), ValidationError> {
    if new.from_user_id == new.to_user_id {
        let mut error = ValidationError::new("distinct_users");
        error.message = Some(SAME_USER.into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MessageUpdate {
    #[validate(length(min = 1, max = 2000))]
    pub message: Option<String>,
}

/// GET /messages query filters.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageSearch {
    #[validate(range(min = 1))]
    pub listing_id: Option<i32>,
    #[validate(range(min = 1))]
    pub from_user_id: Option<i32>,
    #[validate(range(min = 1))]
    pub to_user_id: Option<i32>,
}
