//! Apportionment of a line item between a buyer and their partner.
//!
//! The classification service reports one of three string modes per line
//! item. They are parsed into [`ApportionMode`] immediately so the rest of
//! the pipeline never handles the raw strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// How a line item's cost is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApportionMode {
    /// The buyer pays everything.
    #[serde(rename = "alone")]
    Alone,
    /// Split evenly with the partner. The split itself is computed by the
    /// balance logic, never stored.
    #[serde(rename = "shared")]
    Shared,
    /// The partner is liable for the full amount.
    #[serde(rename = "other")]
    OwedByPartner,
}

/// Persistence fields derived from an [`ApportionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Apportionment {
    pub shared_with: Option<DbId>,
    pub takes_all: bool,
}

impl ApportionMode {
    /// Wire name as used by the classification service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alone => "alone",
            Self::Shared => "shared",
            Self::OwedByPartner => "other",
        }
    }

    /// Parse a wire name. Case and surrounding whitespace are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "alone" => Some(Self::Alone),
            "shared" => Some(Self::Shared),
            "other" => Some(Self::OwedByPartner),
            _ => None,
        }
    }

    /// Whether this mode involves a partner at all.
    pub fn requires_partner(self) -> bool {
        !matches!(self, Self::Alone)
    }

    /// Map the mode onto persistence fields for a buyer with `partner`.
    ///
    /// Returns `None` when the mode needs a partner and there is none;
    /// callers treat that as a hard failure rather than coercing to
    /// [`ApportionMode::Alone`].
    pub fn apportion(self, partner: Option<DbId>) -> Option<Apportionment> {
        match self {
            Self::Alone => Some(Apportionment {
                shared_with: None,
                takes_all: false,
            }),
            Self::Shared => partner.map(|id| Apportionment {
                shared_with: Some(id),
                takes_all: false,
            }),
            Self::OwedByPartner => partner.map(|id| Apportionment {
                shared_with: Some(id),
                takes_all: true,
            }),
        }
    }
}

impl fmt::Display for ApportionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Apportionment {
    /// Recover the mode from stored fields.
    pub fn mode(&self) -> ApportionMode {
        match (self.shared_with, self.takes_all) {
            (None, _) => ApportionMode::Alone,
            (Some(_), false) => ApportionMode::Shared,
            (Some(_), true) => ApportionMode::OwedByPartner,
        }
    }
}
