use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// 1-based position of an installment within a schedule
pub type InstallmentNumber = u32;

/// per-installment collection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionRating {
    /// collected at least the total payment, within tolerance
    Full,
    /// something collected, but short of the total payment
    Partial,
    /// nothing collected
    Missed,
}

impl fmt::Display for CollectionRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CollectionRating::Full => "full",
            CollectionRating::Partial => "partial",
            CollectionRating::Missed => "missed",
        };
        f.write_str(label)
    }
}

/// where an installment stands relative to the as-of date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentState {
    /// matching window still open or not yet reached; no rating assigned
    NotYetDue,
    /// window closed on or before the as-of date; allocation is final
    Rated(CollectionRating),
}

impl InstallmentState {
    pub fn rating(&self) -> Option<CollectionRating> {
        match self {
            InstallmentState::NotYetDue => None,
            InstallmentState::Rated(rating) => Some(*rating),
        }
    }

    pub fn is_due(&self) -> bool {
        matches!(self, InstallmentState::Rated(_))
    }
}
