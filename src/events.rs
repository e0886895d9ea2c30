use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{InstallmentNumber, LoanId};

/// events the engine emits for collection and reporting workflows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // contract events
    LoanQuoted {
        loan_id: LoanId,
        principal: Money,
        term_fortnights: u32,
        gross_loan: Money,
        fortnightly_installment: Money,
    },
    LoanRefinanced {
        previous_loan_id: LoanId,
        new_loan_id: LoanId,
        carried_balance: Money,
        top_up: Money,
        new_gross_loan: Money,
    },
    ScheduleGenerated {
        loan_id: LoanId,
        installments: u32,
        first_due: NaiveDate,
        maturity: NaiveDate,
        total_payable: Money,
    },

    // collection events
    InstallmentCollected {
        loan_id: LoanId,
        installment_number: InstallmentNumber,
        due_date: NaiveDate,
        amount_collected: Money,
    },
    InstallmentPartiallyPaid {
        loan_id: LoanId,
        installment_number: InstallmentNumber,
        due_date: NaiveDate,
        amount_collected: Money,
        shortfall: Money,
    },
    InstallmentMissed {
        loan_id: LoanId,
        installment_number: InstallmentNumber,
        due_date: NaiveDate,
        expected_amount: Money,
    },
    DefaultFeeAccrued {
        loan_id: LoanId,
        installment_number: InstallmentNumber,
        fee: Money,
    },
    UnappliedFundsHeld {
        loan_id: LoanId,
        amount: Money,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
