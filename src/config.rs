use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::rates::RateTable;

/// engine configuration: every business constant the engine applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub rate_table: RateTable,
    #[serde(default)]
    pub quote: QuoteConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
}

/// fees added to principal when quoting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// flat fee charged on every loan
    pub documentation_fee: Money,
    /// share of principal charged for risk insurance
    pub risk_insurance_rate: Rate,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            documentation_fee: Money::from_major(50),
            risk_insurance_rate: Rate::from_percentage(2),
        }
    }
}

/// schedule expansion policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// tax charged on each installment's interest (GST)
    pub tax_rate_on_interest: Rate,
    /// periods the annual rate is apportioned across
    pub periods_per_year: u32,
    /// days between installments
    pub period_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tax_rate_on_interest: Rate::from_percentage(10),
            periods_per_year: 26,
            period_days: 14,
        }
    }
}

/// payment matching and classification policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// days either side of a due date that count toward that installment
    pub grace_days: u32,
    /// shortfall still rated as a full payment
    pub full_payment_tolerance: Money,
    /// penalty accrued once per missed installment
    pub default_fee: Money,
    /// collected-over-expected margin that is not reported as overpayment
    pub overpayment_tolerance: Money,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            grace_days: 0,
            full_payment_tolerance: Money::from_decimal(dec!(0.01)),
            default_fee: Money::ZERO,
            overpayment_tolerance: Money::from_decimal(dec!(0.01)),
        }
    }
}

impl CollectionConfig {
    pub fn with_grace_days(mut self, grace_days: u32) -> Self {
        self.grace_days = grace_days;
        self
    }

    pub fn with_default_fee(mut self, default_fee: Money) -> Self {
        self.default_fee = default_fee;
        self
    }
}

impl EngineConfig {
    /// parse and validate a JSON configuration; missing sections take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quote.documentation_fee.is_negative() {
            return Err(invalid("documentation fee cannot be negative"));
        }
        if self.quote.risk_insurance_rate.is_negative() {
            return Err(invalid("risk insurance rate cannot be negative"));
        }
        if self.schedule.tax_rate_on_interest.is_negative() {
            return Err(invalid("tax rate cannot be negative"));
        }
        if self.schedule.periods_per_year == 0 {
            return Err(invalid("periods per year must be positive"));
        }
        if self.schedule.period_days == 0 {
            return Err(invalid("period length must be at least one day"));
        }
        if self.collection.full_payment_tolerance.is_negative()
            || self.collection.overpayment_tolerance.is_negative()
        {
            return Err(invalid("collection tolerances cannot be negative"));
        }
        if self.collection.default_fee.is_negative() {
            return Err(invalid("default fee cannot be negative"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> EngineError {
    EngineError::InvalidConfiguration {
        message: message.to_string(),
    }
}
