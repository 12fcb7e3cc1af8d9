//! FTP transfer types
//!
//! Representation types selectable with the TYPE command.

use std::fmt;

/// Representation type of transferred data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    #[default]
    Ascii,
    Binary,
}

impl TransferType {
    /// Maps a TYPE argument to a transfer type.
    ///
    /// Only `A` and `I` are understood; anything else yields `None`.
    pub fn from_type_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(TransferType::Ascii),
            "I" => Some(TransferType::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferType::Ascii => write!(f, "ascii"),
            TransferType::Binary => write!(f, "binary"),
        }
    }
}
