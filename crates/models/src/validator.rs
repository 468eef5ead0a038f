//! Validation of CSAF documents before they are stored.

use failure::Error;
use serde_json::Value;

/// Checks whether a CSAF document is acceptable.
///
/// An `Err` means validation could not be performed at all; an invalid
/// document is reported as `Ok(false)`.
pub trait Validator: Send + Sync {
    fn is_valid(&self, csaf: &Value) -> Result<bool, Error>;
}

/// Accepts every document.
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn is_valid(&self, _: &Value) -> Result<bool, Error> {
        Ok(true)
    }
}

/// Requires the fields every CSAF document must carry for the engine to work
/// on it.
pub struct MandatoryFields;

const MANDATORY: &[&str] = &[
    "/document/category",
    "/document/csaf_version",
    "/document/publisher",
    "/document/title",
    "/document/tracking/id",
];

impl Validator for MandatoryFields {
    fn is_valid(&self, csaf: &Value) -> Result<bool, Error> {
        let missing = MANDATORY.iter()
            .filter(|pointer| csaf.pointer(pointer).map_or(true, Value::is_null))
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            log::debug!("Document is missing {:?}", missing);
        }

        Ok(missing.is_empty())
    }
}
