use diesel::{
    dsl::exists,
    prelude::*,
    result::{DatabaseErrorKind, Error as DbError},
};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{
    Pool,
    PooledConnection,
    models::{Document, NewDocument},
    schema::documents,
};
use super::{Revision, Selector, Storage, StorageError, Stored};

/// Storage in a single PostgreSQL table of JSONB documents.
pub struct PgStorage {
    pool: Pool,
}

impl PgStorage {
    pub fn new(pool: Pool) -> PgStorage {
        PgStorage { pool }
    }

    fn connection(&self) -> Result<PooledConnection, StorageError> {
        Ok(self.pool.get()?)
    }

    /// Explain why a conditional statement matched no rows.
    fn missed(&self, db: &PooledConnection, id: Uuid) -> Result<StorageError, StorageError> {
        let found = diesel::select(exists(documents::table.find(id)))
            .get_result::<bool>(&**db)?;

        Ok(if found {
            StorageError::Conflict(id)
        } else {
            StorageError::NotFound(id)
        })
    }
}

fn kind_of(data: &Value) -> Option<&str> {
    data.get("type").and_then(Value::as_str)
}

fn advisory_of(data: &Value) -> Option<&str> {
    data.get("advisoryId").and_then(Value::as_str)
}

impl From<Document> for Stored {
    fn from(document: Document) -> Stored {
        Stored {
            id: document.id,
            revision: Revision::from(document.revision),
            data: document.data,
        }
    }
}

impl Storage for PgStorage {
    fn create(&self, id: Uuid, data: &Value) -> Result<Revision, StorageError> {
        let db = self.connection()?;
        let revision = Revision::first();

        diesel::insert_into(documents::table)
            .values(&NewDocument {
                id,
                kind: kind_of(data),
                advisory_id: advisory_of(data),
                revision: revision.as_str(),
                data,
            })
            .execute(&*db)
            .map_err(|err| match err {
                DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) =>
                    StorageError::AlreadyExists(id),
                err => err.into(),
            })?;

        Ok(revision)
    }

    fn read(&self, id: Uuid) -> Result<Stored, StorageError> {
        let db = self.connection()?;

        documents::table
            .find(id)
            .get_result::<Document>(&*db)
            .optional()?
            .map(Stored::from)
            .ok_or(StorageError::NotFound(id))
    }

    fn write(&self, id: Uuid, data: &Value, revision: &Revision)
    -> Result<Revision, StorageError> {
        let db = self.connection()?;
        let next = revision.next();

        let updated = diesel::update(documents::table
                .filter(documents::id.eq(id)
                    .and(documents::revision.eq(revision.as_str()))))
            .set((
                documents::kind.eq(kind_of(data)),
                documents::advisory_id.eq(advisory_of(data)),
                documents::revision.eq(next.as_str()),
                documents::data.eq(data),
            ))
            .execute(&*db)?;

        if updated == 0 {
            return Err(self.missed(&db, id)?);
        }

        Ok(next)
    }

    fn delete(&self, id: Uuid, revision: &Revision) -> Result<(), StorageError> {
        let db = self.connection()?;

        let deleted = diesel::delete(documents::table
                .filter(documents::id.eq(id)
                    .and(documents::revision.eq(revision.as_str()))))
            .execute(&*db)?;

        if deleted == 0 {
            return Err(self.missed(&db, id)?);
        }

        Ok(())
    }

    /// Find documents, narrowing the query by type and advisory in SQL.
    /// The rest of the selector is evaluated on the rows returned.
    fn find(&self, selector: &Selector) -> Result<Vec<Stored>, StorageError> {
        let db = self.connection()?;

        let mut query = documents::table
            .order_by(documents::seq.asc())
            .into_boxed();

        if let Some(kind) = selector.required_type() {
            query = query.filter(documents::kind.eq(kind.to_string()));
        } else if let Some(part) = selector.required_substring("type") {
            query = query.filter(documents::kind.like(format!("%{}%", escape_like(part))));
        }

        if let Some(advisory) = selector.required_advisory() {
            query = query.filter(documents::advisory_id.eq(advisory.to_string()));
        }

        Ok(query
            .get_results::<Document>(&*db)?
            .into_iter()
            .filter(|document| selector.matches(&document.data))
            .map(Stored::from)
            .collect())
    }
}

/// Escape wildcards of a LIKE pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' | '_' | '\\' => escaped.push('\\'),
            _ => (),
        }
        escaped.push(c);
    }
    escaped
}
