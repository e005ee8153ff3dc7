use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validator::Validator;

pub const GROUP_SORT_SAFELIST: &[&str] = &[
    "group_id",
    "name",
    "num_of_members",
    "-group_id",
    "-name",
    "-num_of_members",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    #[sqlx(rename = "group_id")]
    pub id: i64,
    pub name: String,
    pub num_of_members: i32,
}

/// Optional list predicates; `None` matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    pub name: Option<String>,
    pub num_of_members: Option<i32>,
}

pub fn validate_group(v: &mut Validator, group: &Group) {
    v.check(!group.name.is_empty(), "name", "must be provided");
    v.check(group.num_of_members != 0, "num_of_members", "must be greater than 0");
}
