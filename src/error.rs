use thiserror::Error;

use crate::normalize::FormKind;

/// Failure to map a form export onto the canonical record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The form's layout no longer carries a column this kind requires verbatim.
    #[error("{kind} form is missing expected column `{expected}`; available columns: {available:?}")]
    MissingColumn {
        kind: FormKind,
        expected: String,
        available: Vec<String>,
    },
}
