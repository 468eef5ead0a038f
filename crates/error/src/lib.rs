// Lets `#[derive(ApiError)]` resolve `csaf_cms_error` paths inside this crate.
extern crate self as csaf_cms_error;

use csaf_cms_macros::From;
use failure::Fail;
use log::error;
use serde::Serialize;
use std::{borrow::Cow, fmt};

pub use csaf_cms_macros::ApiError;

/// Broad category of an error, as reported to the caller.
///
/// These mirror HTTP response classes, so that a transport layer can map them
/// one to one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    BadRequest,
    Forbidden,
    NotFound,
    Conflict,
    UnprocessableEntity,
    InternalServerError,
}

impl Status {
    /// Is this status caused by the caller (as opposed to the system)?
    pub fn is_client_error(self) -> bool {
        self != Status::InternalServerError
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Status::BadRequest => "bad request",
            Status::Forbidden => "forbidden",
            Status::NotFound => "not found",
            Status::Conflict => "conflict",
            Status::UnprocessableEntity => "unprocessable entity",
            Status::InternalServerError => "internal error",
        })
    }
}

/// An error that occurred while executing an operation on behalf of a caller.
pub trait ApiError: Fail {
    /// Category of this error.
    fn status(&self) -> Status;

    /// Internal code describing this error.
    ///
    /// This code is used to identify this error outside the system, and thus
    /// should only be present for errors which are intended to be reported
    /// to the user in detail.
    fn code(&self) -> Option<Cow<str>>;
}

/// This implementation is required to make `#[cause]` on a `Box<dyn ApiError>`
/// work.
impl Fail for Box<dyn ApiError> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn cause(&self) -> Option<&dyn Fail> {
        (**self).cause()
    }

    fn backtrace(&self) -> Option<&failure::Backtrace> {
        (**self).backtrace()
    }
}

/// A wrapper around many types of errors, including user-facing [`ApiError`]s
/// as well as errors that should not be reported to the user in detail, such
/// as database connection errors.
#[derive(Debug, Fail, From)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Api(#[cause] Box<dyn ApiError>),
    /// Generic system error.
    #[fail(display = "{}", _0)]
    System(#[cause] #[from] std::io::Error),
    /// Error communicating with the database.
    #[fail(display = "{}", _0)]
    Db(#[cause] #[from] diesel::result::Error),
    /// Error obtaining database connection from the pool.
    #[fail(display = "{}", _0)]
    DbPool(#[cause] #[from] r2d2::Error),
    /// A stored document could not be (de)serialized.
    #[fail(display = "{}", _0)]
    Json(#[cause] #[from] serde_json::Error),
    /// Failure of an external collaborator, such as a validator or a publish
    /// sink.
    #[fail(display = "{}", _0)]
    External(#[from] failure::Error),
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Error::Api(err) => err.status(),
            _ => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> Option<Cow<str>> {
        match self {
            Error::Api(err) => err.code(),
            _ => None,
        }
    }

    /// Render this error as a structured report.
    ///
    /// Internal errors are logged and reported without detail.
    pub fn report(&self) -> ErrorReport {
        match self {
            Error::Api(err) if err.code().is_some() => ErrorReport {
                status: err.status(),
                error: err.code().map(Cow::into_owned),
                raw: Some(err.to_string()),
            },
            _ => {
                error!("{}", self);
                ErrorReport {
                    status: self.status(),
                    error: None,
                    raw: None,
                }
            }
        }
    }
}

impl<T: ApiError> From<T> for Error {
    fn from(error: T) -> Error {
        Error::Api(Box::new(error))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}
