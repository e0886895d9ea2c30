use chrono::{Days, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ScheduleConfig};
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::quote::LoanContract;
use crate::types::{InstallmentNumber, LoanId};

/// one dated installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub installment_number: InstallmentNumber,
    pub payment_date: NaiveDate,
    pub opening_balance: Money,
    pub principal_amount: Money,
    pub interest_amount: Money,
    /// tax (GST) on this installment's interest
    pub tax_amount: Money,
    pub total_payment: Money,
    pub remaining_balance: Money,
}

/// dated installment schedule for one contract
///
/// Generated once and never edited; a changed contract gets a new schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord")]
pub struct RepaymentSchedule {
    loan_id: LoanId,
    start_date: NaiveDate,
    gross_loan: Money,
    interest_rate: Rate,
    entries: Vec<ScheduleEntry>,
}

/// stored schedule, verified on the way in
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRecord {
    pub loan_id: LoanId,
    pub start_date: NaiveDate,
    pub gross_loan: Money,
    pub interest_rate: Rate,
    pub entries: Vec<ScheduleEntry>,
}

impl TryFrom<ScheduleRecord> for RepaymentSchedule {
    type Error = EngineError;

    fn try_from(record: ScheduleRecord) -> Result<Self> {
        let schedule = RepaymentSchedule {
            loan_id: record.loan_id,
            start_date: record.start_date,
            gross_loan: record.gross_loan,
            interest_rate: record.interest_rate,
            entries: record.entries,
        };
        schedule.verify()?;
        Ok(schedule)
    }
}

impl RepaymentSchedule {
    pub fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn gross_loan(&self) -> Money {
        self.gross_loan
    }

    pub fn interest_rate(&self) -> Rate {
        self.interest_rate
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// entry by 1-based installment number
    pub fn entry(&self, installment_number: InstallmentNumber) -> Option<&ScheduleEntry> {
        let index = installment_number.checked_sub(1)?;
        self.entries.get(index as usize)
    }

    /// date of the final installment
    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.payment_date)
    }

    /// installments dated on or before `as_of`
    pub fn due_as_of(&self, as_of: NaiveDate) -> &[ScheduleEntry] {
        let due = self.entries.partition_point(|e| e.payment_date <= as_of);
        &self.entries[..due]
    }

    /// first installment dated strictly after `date`
    pub fn next_due_after(&self, date: NaiveDate) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.payment_date > date)
    }

    /// balance after an installment; the gross loan before the first one
    pub fn balance_after(&self, installment_number: InstallmentNumber) -> Money {
        self.entry(installment_number)
            .map(|e| e.remaining_balance)
            .unwrap_or(self.gross_loan)
    }

    pub fn total_principal(&self) -> Money {
        self.entries.iter().map(|e| e.principal_amount).sum()
    }

    pub fn total_interest(&self) -> Money {
        self.entries.iter().map(|e| e.interest_amount).sum()
    }

    pub fn total_tax(&self) -> Money {
        self.entries.iter().map(|e| e.tax_amount).sum()
    }

    pub fn total_payable(&self) -> Money {
        self.entries.iter().map(|e| e.total_payment).sum()
    }

    /// re-check the balance invariants: dates ascend, balance never rises,
    /// principal sums to the gross loan and the last balance is exactly zero
    pub fn verify(&self) -> Result<()> {
        let last = self.entries.last().ok_or_else(|| EngineError::RoundingInvariant {
            message: "schedule has no installments".to_string(),
        })?;

        let mut previous_balance = self.gross_loan;
        let mut previous_date: Option<NaiveDate> = None;
        for entry in &self.entries {
            if entry.remaining_balance > previous_balance || entry.remaining_balance.is_negative() {
                return Err(EngineError::RoundingInvariant {
                    message: format!(
                        "balance after installment {} is {} (previous {})",
                        entry.installment_number, entry.remaining_balance, previous_balance
                    ),
                });
            }
            if previous_date.is_some_and(|d| entry.payment_date <= d) {
                return Err(EngineError::RoundingInvariant {
                    message: format!("installment {} is not dated after its predecessor", entry.installment_number),
                });
            }
            previous_balance = entry.remaining_balance;
            previous_date = Some(entry.payment_date);
        }

        if !last.remaining_balance.is_zero() {
            return Err(EngineError::RoundingInvariant {
                message: format!("final balance is {}, expected 0", last.remaining_balance),
            });
        }

        let principal = self.total_principal();
        if principal != self.gross_loan {
            return Err(EngineError::RoundingInvariant {
                message: format!("principal sums to {}, gross loan is {}", principal, self.gross_loan),
            });
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// expands a contract into dated installments
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    config: ScheduleConfig,
}

impl ScheduleGenerator {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.schedule.clone())
    }

    /// Straight-line amortization of the gross loan.
    ///
    /// Each installment repays `gross / term` (rounded to cents) and charges interest
    /// on the balance before the payment at `rate / periods_per_year`, plus tax on
    /// that interest. The final installment's principal is whatever balance remains,
    /// so the schedule always closes at exactly zero.
    pub fn generate(&self, contract: &LoanContract, start_date: NaiveDate) -> Result<RepaymentSchedule> {
        let term = contract.term_fortnights();
        if term == 0 {
            return Err(EngineError::invalid_input("term_fortnights", "must be positive"));
        }

        let gross_loan = contract.gross_loan();
        let rate = contract.interest_rate();
        let periods_per_year = Decimal::from(self.config.periods_per_year);
        let base_principal = (gross_loan / Decimal::from(term)).round_cents();

        let mut entries = Vec::with_capacity(term as usize);
        let mut balance = gross_loan;

        for index in 0..term {
            let payment_date = self.payment_date(start_date, index)?;

            let interest_amount = (balance.apply(rate) / periods_per_year).round_cents();
            let tax_amount = interest_amount.apply(self.config.tax_rate_on_interest).round_cents();

            let principal_amount = if index + 1 == term {
                balance
            } else {
                base_principal.min(balance)
            };
            let remaining_balance = balance - principal_amount;

            entries.push(ScheduleEntry {
                installment_number: index + 1,
                payment_date,
                opening_balance: balance,
                principal_amount,
                interest_amount,
                tax_amount,
                total_payment: principal_amount + interest_amount + tax_amount,
                remaining_balance,
            });

            balance = remaining_balance;
        }

        let schedule = RepaymentSchedule {
            loan_id: contract.loan_id(),
            start_date,
            gross_loan,
            interest_rate: rate,
            entries,
        };
        schedule.verify()?;

        debug!(
            "generated {} installments for loan {} from {}, total payable {}",
            term,
            schedule.loan_id,
            start_date,
            schedule.total_payable()
        );

        Ok(schedule)
    }

    /// generate and record a `ScheduleGenerated` event
    pub fn generate_into(
        &self,
        contract: &LoanContract,
        start_date: NaiveDate,
        events: &mut EventStore,
    ) -> Result<RepaymentSchedule> {
        let schedule = self.generate(contract, start_date)?;
        events.emit(Event::ScheduleGenerated {
            loan_id: schedule.loan_id,
            installments: schedule.len() as u32,
            first_due: start_date,
            maturity: schedule.maturity_date().unwrap_or(start_date),
            total_payable: schedule.total_payable(),
        });
        Ok(schedule)
    }

    fn payment_date(&self, start_date: NaiveDate, index: u32) -> Result<NaiveDate> {
        let offset = u64::from(index) * u64::from(self.config.period_days);
        start_date
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| EngineError::invalid_input("start_date", "installment dates overflow the calendar"))
    }
}
