use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{EngineConfig, QuoteConfig};
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::rates::RateTable;
use crate::types::LoanId;

/// the quoted terms of one loan
///
/// Every derived amount is computed once by [`LoanQuoteCalculator`] and cannot be
/// set independently; contracts read back from storage go through
/// [`LoanContract::from_record`], which recomputes and rejects disagreements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ContractRecord", into = "ContractRecord")]
pub struct LoanContract {
    loan_id: LoanId,
    principal: Money,
    term_fortnights: u32,
    interest_rate: Rate,
    interest_amount: Money,
    risk_insurance_amount: Money,
    documentation_fee: Money,
    gross_loan: Money,
    fortnightly_installment: Money,
    refinanced_from: Option<LoanId>,
}

/// flat, persistence-shaped view of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub loan_id: LoanId,
    pub principal: Money,
    pub term_fortnights: u32,
    pub interest_rate_percent: Decimal,
    pub interest_amount: Money,
    pub risk_insurance_amount: Money,
    pub documentation_fee: Money,
    pub gross_loan: Money,
    pub fortnightly_installment: Money,
    #[serde(default)]
    pub refinanced_from: Option<LoanId>,
}

impl LoanContract {
    /// round-then-sum: each component is rounded to cents before the gross is formed,
    /// so the stored gross always equals the sum of the stored components
    fn derive(
        loan_id: LoanId,
        principal: Money,
        term: u32,
        interest_rate: Rate,
        risk_insurance_amount: Money,
        documentation_fee: Money,
        refinanced_from: Option<LoanId>,
    ) -> Self {
        let interest_amount = principal.apply(interest_rate).round_cents();
        let gross_loan = principal + interest_amount + risk_insurance_amount + documentation_fee;
        let fortnightly_installment = (gross_loan / Decimal::from(term)).round_cents();

        Self {
            loan_id,
            principal,
            term_fortnights: term,
            interest_rate,
            interest_amount,
            risk_insurance_amount,
            documentation_fee,
            gross_loan,
            fortnightly_installment,
            refinanced_from,
        }
    }

    /// rebuild a stored contract, recomputing every derived amount
    pub fn from_record(record: ContractRecord) -> Result<Self> {
        validate_principal(record.principal)?;
        if record.term_fortnights == 0 {
            return Err(EngineError::invalid_input("term_fortnights", "must be positive"));
        }
        if record.interest_rate_percent < Decimal::ZERO {
            return Err(EngineError::invalid_input("interest_rate_percent", "cannot be negative"));
        }
        validate_fee("risk_insurance_amount", record.risk_insurance_amount)?;
        validate_fee("documentation_fee", record.documentation_fee)?;

        let contract = Self::derive(
            record.loan_id,
            record.principal,
            record.term_fortnights,
            Rate::from_percent(record.interest_rate_percent),
            record.risk_insurance_amount,
            record.documentation_fee,
            record.refinanced_from,
        );

        let checks = [
            ("interest_amount", record.interest_amount, contract.interest_amount),
            ("gross_loan", record.gross_loan, contract.gross_loan),
            (
                "fortnightly_installment",
                record.fortnightly_installment,
                contract.fortnightly_installment,
            ),
        ];
        for (field, stored, derived) in checks {
            if stored != derived {
                return Err(EngineError::invalid_input(
                    field,
                    format!("stored {} but inputs derive {}", stored, derived),
                ));
            }
        }

        Ok(contract)
    }

    pub fn to_record(&self) -> ContractRecord {
        ContractRecord {
            loan_id: self.loan_id,
            principal: self.principal,
            term_fortnights: self.term_fortnights,
            interest_rate_percent: self.interest_rate.as_percentage(),
            interest_amount: self.interest_amount,
            risk_insurance_amount: self.risk_insurance_amount,
            documentation_fee: self.documentation_fee,
            gross_loan: self.gross_loan,
            fortnightly_installment: self.fortnightly_installment,
            refinanced_from: self.refinanced_from,
        }
    }

    pub fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn term_fortnights(&self) -> u32 {
        self.term_fortnights
    }

    /// rate copied from the table when the loan was quoted
    pub fn interest_rate(&self) -> Rate {
        self.interest_rate
    }

    pub fn interest_amount(&self) -> Money {
        self.interest_amount
    }

    pub fn risk_insurance_amount(&self) -> Money {
        self.risk_insurance_amount
    }

    pub fn documentation_fee(&self) -> Money {
        self.documentation_fee
    }

    pub fn gross_loan(&self) -> Money {
        self.gross_loan
    }

    pub fn fortnightly_installment(&self) -> Money {
        self.fortnightly_installment
    }

    pub fn refinanced_from(&self) -> Option<LoanId> {
        self.refinanced_from
    }

    /// interest, insurance and documentation charges on top of principal
    pub fn total_charges(&self) -> Money {
        self.interest_amount + self.risk_insurance_amount + self.documentation_fee
    }
}

impl TryFrom<ContractRecord> for LoanContract {
    type Error = EngineError;

    fn try_from(record: ContractRecord) -> Result<Self> {
        LoanContract::from_record(record)
    }
}

impl From<LoanContract> for ContractRecord {
    fn from(contract: LoanContract) -> Self {
        contract.to_record()
    }
}

/// turns a principal and a term into a loan contract
#[derive(Debug, Clone)]
pub struct LoanQuoteCalculator {
    rate_table: RateTable,
    config: QuoteConfig,
}

impl LoanQuoteCalculator {
    pub fn new(rate_table: RateTable, config: QuoteConfig) -> Self {
        Self { rate_table, config }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.rate_table.clone(), config.quote.clone())
    }

    pub fn rate_table(&self) -> &RateTable {
        &self.rate_table
    }

    /// quote a new loan under a freshly assigned id
    pub fn quote(&self, principal: Money, term: u32) -> Result<LoanContract> {
        self.quote_for_loan(Uuid::new_v4(), principal, term)
    }

    /// quote under an existing loan id; deterministic for fixed inputs
    pub fn quote_for_loan(&self, loan_id: LoanId, principal: Money, term: u32) -> Result<LoanContract> {
        self.build(loan_id, principal, term, None)
    }

    /// quote and record a `LoanQuoted` event
    pub fn quote_into(
        &self,
        loan_id: LoanId,
        principal: Money,
        term: u32,
        events: &mut EventStore,
    ) -> Result<LoanContract> {
        let contract = self.quote_for_loan(loan_id, principal, term)?;
        events.emit(Event::LoanQuoted {
            loan_id,
            principal: contract.principal,
            term_fortnights: contract.term_fortnights,
            gross_loan: contract.gross_loan,
            fortnightly_installment: contract.fortnightly_installment,
        });
        Ok(contract)
    }

    /// quote a replacement contract on the outstanding balance plus any top-up.
    ///
    /// The new contract gets a new id and points back at the old one; the old
    /// contract and its schedule stay as they were.
    pub fn refinance(
        &self,
        previous: &LoanContract,
        outstanding_balance: Money,
        top_up: Money,
        new_term: u32,
        events: &mut EventStore,
    ) -> Result<LoanContract> {
        if outstanding_balance.is_negative() {
            return Err(EngineError::invalid_input("outstanding_balance", "cannot be negative"));
        }
        if top_up.is_negative() {
            return Err(EngineError::invalid_input("top_up", "cannot be negative"));
        }

        let principal = outstanding_balance + top_up;
        let contract = self.build(Uuid::new_v4(), principal, new_term, Some(previous.loan_id))?;

        events.emit(Event::LoanRefinanced {
            previous_loan_id: previous.loan_id,
            new_loan_id: contract.loan_id,
            carried_balance: outstanding_balance,
            top_up,
            new_gross_loan: contract.gross_loan,
        });

        Ok(contract)
    }

    fn build(
        &self,
        loan_id: LoanId,
        principal: Money,
        term: u32,
        refinanced_from: Option<LoanId>,
    ) -> Result<LoanContract> {
        validate_principal(principal)?;
        let rate = self.rate_table.lookup_rate(term)?;

        let risk_insurance_amount = principal.apply(self.config.risk_insurance_rate).round_cents();
        let documentation_fee = self.config.documentation_fee.round_cents();

        let contract = LoanContract::derive(
            loan_id,
            principal,
            term,
            rate,
            risk_insurance_amount,
            documentation_fee,
            refinanced_from,
        );

        debug!(
            "quoted loan {}: principal {} over {} fortnights at {} -> gross {}, installment {}",
            loan_id, principal, term, rate, contract.gross_loan, contract.fortnightly_installment
        );

        Ok(contract)
    }
}

impl Default for LoanQuoteCalculator {
    fn default() -> Self {
        Self::new(RateTable::standard(), QuoteConfig::default())
    }
}

fn validate_principal(principal: Money) -> Result<()> {
    if !principal.is_positive() {
        return Err(EngineError::invalid_input("principal", "must be greater than zero"));
    }
    if !principal.is_whole_cents() {
        return Err(EngineError::invalid_input("principal", "must be a whole number of cents"));
    }
    Ok(())
}

fn validate_fee(field: &str, amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(EngineError::invalid_input(field, "cannot be negative"));
    }
    if !amount.is_whole_cents() {
        return Err(EngineError::invalid_input(field, "must be a whole number of cents"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateTableEntry;
    use crate::schedule::ScheduleGenerator;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_quote() {
        let calculator = LoanQuoteCalculator::default();
        let contract = calculator.quote(Money::from_major(10_000), 12).unwrap();

        assert_eq!(contract.interest_rate(), Rate::from_percentage(34));
        assert_eq!(contract.interest_amount(), Money::from_major(3_400));
        assert_eq!(contract.risk_insurance_amount(), Money::from_major(200));
        assert_eq!(contract.documentation_fee(), Money::from_major(50));
        assert_eq!(contract.gross_loan(), Money::from_major(13_650));
        assert_eq!(contract.fortnightly_installment(), Money::from_str_exact("1137.50").unwrap());
        assert_eq!(contract.total_charges(), Money::from_major(3_650));
        assert_eq!(contract.refinanced_from(), None);
    }

    #[test]
    fn test_round_then_sum() {
        let calculator = LoanQuoteCalculator::default();
        // 333.33 * 22% = 73.3326, * 2% = 6.6666
        let contract = calculator.quote(Money::from_str_exact("333.33").unwrap(), 6).unwrap();

        assert_eq!(contract.interest_amount(), Money::from_str_exact("73.33").unwrap());
        assert_eq!(contract.risk_insurance_amount(), Money::from_str_exact("6.67").unwrap());
        let resummed = contract.principal()
            + contract.interest_amount()
            + contract.risk_insurance_amount()
            + contract.documentation_fee();
        assert_eq!(contract.gross_loan(), resummed);
        assert_eq!(contract.gross_loan(), Money::from_str_exact("463.33").unwrap());
        // 463.33 / 6 = 77.2216...
        assert_eq!(contract.fortnightly_installment(), Money::from_str_exact("77.22").unwrap());
    }

    #[test]
    fn test_installment_rounds_half_up() {
        let table = RateTable::new(vec![RateTableEntry { term: 8, annual_rate_percent: dec!(0) }]).unwrap();
        let config = QuoteConfig {
            documentation_fee: Money::ZERO,
            risk_insurance_rate: Rate::ZERO,
        };
        let calculator = LoanQuoteCalculator::new(table, config);
        // 100.04 / 8 = 12.505
        let contract = calculator.quote(Money::from_str_exact("100.04").unwrap(), 8).unwrap();
        assert_eq!(contract.fortnightly_installment(), Money::from_str_exact("12.51").unwrap());
    }

    #[test]
    fn test_invalid_inputs() {
        let calculator = LoanQuoteCalculator::default();

        assert_eq!(
            calculator.quote(Money::from_major(1_000), 11).unwrap_err(),
            EngineError::InvalidTerm { term: 11 }
        );

        match calculator.quote(Money::ZERO, 12).unwrap_err() {
            EngineError::InvalidInput { field, .. } => assert_eq!(field, "principal"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(calculator.quote(Money::from_major(-5), 12).is_err());
        assert!(calculator.quote(Money::from_str_exact("10.001").unwrap(), 12).is_err());
    }

    #[test]
    fn test_quote_is_deterministic() {
        let calculator = LoanQuoteCalculator::default();
        let loan_id = Uuid::new_v4();
        let first = calculator.quote_for_loan(loan_id, Money::from_major(2_750), 18).unwrap();
        let second = calculator.quote_for_loan(loan_id, Money::from_major(2_750), 18).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_injected_rate_table_and_fee() {
        let table = RateTable::new(vec![RateTableEntry { term: 4, annual_rate_percent: dec!(10) }]).unwrap();
        let config = QuoteConfig {
            documentation_fee: Money::from_major(25),
            risk_insurance_rate: Rate::from_percentage(2),
        };
        let calculator = LoanQuoteCalculator::new(table, config);

        let contract = calculator.quote(Money::from_major(1_000), 4).unwrap();
        assert_eq!(contract.gross_loan(), Money::from_major(1_145));
        assert!(calculator.quote(Money::from_major(1_000), 12).is_err());
    }

    #[test]
    fn test_record_round_trip_and_tamper_detection() {
        let calculator = LoanQuoteCalculator::default();
        let contract = calculator.quote(Money::from_major(5_000), 10).unwrap();

        let restored = LoanContract::from_record(contract.to_record()).unwrap();
        assert_eq!(restored, contract);

        let json = serde_json::to_string(&contract).unwrap();
        let parsed: LoanContract = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, contract);

        let mut tampered = contract.to_record();
        tampered.gross_loan = tampered.gross_loan + Money::CENT;
        match LoanContract::from_record(tampered).unwrap_err() {
            EngineError::InvalidInput { field, .. } => assert_eq!(field, "gross_loan"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_stored_rate_survives_table_change() {
        let contract = LoanQuoteCalculator::default().quote(Money::from_major(10_000), 12).unwrap();
        let json = serde_json::to_string(&contract).unwrap();

        let repriced = LoanQuoteCalculator::new(
            RateTable::new(vec![
                RateTableEntry { term: 12, annual_rate_percent: dec!(40) },
                RateTableEntry { term: 14, annual_rate_percent: dec!(44) },
            ])
            .unwrap(),
            QuoteConfig::default(),
        );
        let withdrawn = LoanQuoteCalculator::new(
            RateTable::new(vec![RateTableEntry { term: 14, annual_rate_percent: dec!(38) }]).unwrap(),
            QuoteConfig::default(),
        );
        assert_eq!(repriced.quote(Money::from_major(10_000), 12).unwrap().interest_amount(), Money::from_major(4_000));
        assert_eq!(withdrawn.quote(Money::from_major(10_000), 12), Err(EngineError::InvalidTerm { term: 12 }));

        let restored: LoanContract = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, contract);
        assert_eq!(restored.interest_rate(), Rate::from_percentage(34));
        assert_eq!(restored.interest_amount(), Money::from_major(3_400));
        assert_eq!(restored.gross_loan(), Money::from_major(13_650));

        // schedules expand from the stored rate, not from whichever table is current
        let schedule = ScheduleGenerator::default()
            .generate(&restored, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(schedule.interest_rate(), Rate::from_percentage(34));
        assert_eq!(schedule.entries()[0].interest_amount, Money::from_str_exact("178.50").unwrap());
    }

    #[test]
    fn test_refinance_creates_new_contract() {
        let calculator = LoanQuoteCalculator::default();
        let mut events = EventStore::new();
        let original = calculator.quote(Money::from_major(1_000), 10).unwrap();

        let refinanced = calculator
            .refinance(&original, Money::from_major(600), Money::from_major(400), 12, &mut events)
            .unwrap();

        assert_ne!(refinanced.loan_id(), original.loan_id());
        assert_eq!(refinanced.refinanced_from(), Some(original.loan_id()));
        assert_eq!(refinanced.principal(), Money::from_major(1_000));
        assert_eq!(refinanced.interest_rate(), Rate::from_percentage(34));
        assert_eq!(original.term_fortnights(), 10);
        assert!(matches!(events.events()[0], Event::LoanRefinanced { .. }));

        assert!(calculator
            .refinance(&original, Money::from_major(-1), Money::ZERO, 12, &mut events)
            .is_err());
    }

    #[test]
    fn test_quote_into_emits_event() {
        let calculator = LoanQuoteCalculator::default();
        let mut events = EventStore::new();
        let loan_id = Uuid::new_v4();
        calculator.quote_into(loan_id, Money::from_major(10_000), 12, &mut events).unwrap();

        assert_eq!(
            events.take_events(),
            vec![Event::LoanQuoted {
                loan_id,
                principal: Money::from_major(10_000),
                term_fortnights: 12,
                gross_loan: Money::from_major(13_650),
                fortnightly_installment: Money::from_str_exact("1137.5").unwrap(),
            }]
        );
    }
}
