use csaf_cms_macros::From;
use diesel::pg::PgConnection;
use failure::Fail;
use r2d2_diesel::ConnectionManager;
use serde::Deserialize;
use std::env;

pub mod models;
pub mod schema;

/// A pool of database connections.
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// A single database connection taken from a [`Pool`] of connection.
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub url: String,
}

/// Find the correct database URL based on configuration and environment.
pub fn database_url(cfg: Option<&Config>) -> Result<String, GetDatabaseUrlError> {
    match env::var("DATABASE_URL") {
        Ok(url) => return Ok(url),
        Err(env::VarError::NotUnicode(_)) => {
            return Err(GetDatabaseUrlError::VarInvalidUnicode);
        }
        Err(env::VarError::NotPresent) => (),
    }

    if let Some(ref db) = cfg {
        return Ok(db.url.clone());
    }

    Err(GetDatabaseUrlError::NotConfigured)
}

#[derive(Debug, Fail)]
pub enum GetDatabaseUrlError {
    #[fail(display = "No database connection configured")]
    NotConfigured,
    #[fail(display = "DATABASE_URL contains invalid Unicode")]
    VarInvalidUnicode,
}

/// Create a connection pool for the database and bring its schema up to
/// date.
pub fn configure_pool(cfg: Option<&Config>) -> Result<Pool, ConnectionError> {
    let url = database_url(cfg)?;
    let manager = ConnectionManager::new(url);
    let pool = Pool::new(manager)?;

    // Try to connect to database to detect errors early.
    let conn = pool.get()?;

    embedded_migrations::run_with_output(&*conn, &mut std::io::stderr())?;

    Ok(pool)
}

#[derive(Debug, Fail, From)]
pub enum ConnectionError {
    #[fail(display = "{}", _0)]
    Configuration(#[cause] #[from] GetDatabaseUrlError),
    #[fail(display = "{}", _0)]
    Pool(#[cause] #[from] r2d2::Error),
    #[fail(display = "Could not run migrations: {}", _0)]
    Migration(#[cause] #[from] diesel_migrations::RunMigrationsError),
}

embed_migrations!();
