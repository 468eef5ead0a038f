use serde_json::Value;
use uuid::Uuid;

use super::schema::documents;

#[derive(Clone, Debug, Queryable)]
pub struct Document {
    pub id: Uuid,
    pub seq: i64,
    /// Copy of `data.type`, kept in a column for filtering.
    pub kind: Option<String>,
    /// Copy of `data.advisoryId`, kept in a column for filtering.
    pub advisory_id: Option<String>,
    pub revision: String,
    pub data: Value,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "documents"]
pub struct NewDocument<'a> {
    pub id: Uuid,
    pub kind: Option<&'a str>,
    pub advisory_id: Option<&'a str>,
    pub revision: &'a str,
    pub data: &'a Value,
}
