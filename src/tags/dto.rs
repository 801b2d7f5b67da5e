use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

lazy_static! {
    static ref HANDLE_RE: Regex = Regex::new(r"^[a-z0-9_-]{1,25}$").unwrap();
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewTag {
    #[validate(regex(path = *HANDLE_RE, message = "must be 1-25 lowercase letters, digits, '-' or '_'"))]
    pub handle: String,
    #[validate(length(min = 1, max = 50))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TagUpdate {
    #[validate(length(min = 1, max = 50))]
    pub description: Option<String>,
}
