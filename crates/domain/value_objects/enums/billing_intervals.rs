use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Billing cadence of a purchased price. `Lifetime` never comes from the
/// provider's `recurring.interval`; it is only assigned via the catalog slot
/// that matched the price id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingInterval {
    Month,
    Year,
    Lifetime,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
            BillingInterval::Lifetime => "lifetime",
        }
    }

    /// Maps a provider recurring interval. Anything other than month/year
    /// (week, day, absent) is treated as unknown.
    pub fn from_provider_interval(value: Option<&str>) -> Option<Self> {
        match value {
            Some("month") => Some(BillingInterval::Month),
            Some("year") => Some(BillingInterval::Year),
            _ => None,
        }
    }
}

impl Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
