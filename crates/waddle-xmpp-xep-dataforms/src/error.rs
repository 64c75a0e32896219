//! Error types for data form handling.

use thiserror::Error;

/// Data form errors.
///
/// Only structural mismatches are errors; malformed field content degrades
/// to empty values instead.
#[derive(Debug, Error)]
pub enum DataFormError {
    /// The element is not a `jabber:x:data` `<x/>` element.
    #[error("not a data form: <{name} xmlns='{ns}'/>")]
    NotADataForm {
        /// Element name found
        name: String,
        /// Element namespace found
        ns: String,
    },
}
