//! Views over reconciliation output for the arrears, missed-payment and
//! partial-payment screens and their exports.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::reconcile::{LoanCollectionSummary, Reconciliation};
use crate::types::{CollectionRating, InstallmentNumber, LoanId};

/// one short-paid installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLine {
    pub loan_id: LoanId,
    pub installment_number: InstallmentNumber,
    pub due_date: NaiveDate,
    pub expected_amount: Money,
    pub amount_collected: Money,
    pub shortfall: Money,
    pub rating: CollectionRating,
    pub days_overdue: i64,
}

/// arrears position of one loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearsReport {
    pub loan_id: LoanId,
    pub as_of: NaiveDate,
    pub arrears: Money,
    pub default_fees_accrued: Money,
    /// arrears plus default fees
    pub total_overdue: Money,
    pub oldest_unpaid_due_date: Option<NaiveDate>,
    pub days_in_arrears: i64,
    pub missed_installments: u32,
    pub partial_installments: u32,
}

impl ArrearsReport {
    pub fn from_reconciliation(reconciliation: &Reconciliation) -> Self {
        let summary = &reconciliation.summary;
        let oldest_unpaid_due_date = if summary.arrears.is_positive() {
            reconciliation
                .results
                .iter()
                .find(|r| {
                    matches!(
                        r.collection_rating(),
                        Some(CollectionRating::Partial | CollectionRating::Missed)
                    )
                })
                .map(|r| r.due_date)
        } else {
            None
        };

        Self {
            loan_id: summary.loan_id,
            as_of: summary.as_of,
            arrears: summary.arrears,
            default_fees_accrued: summary.default_fees_accrued,
            total_overdue: summary.arrears + summary.default_fees_accrued,
            oldest_unpaid_due_date,
            days_in_arrears: oldest_unpaid_due_date
                .map(|due| (summary.as_of - due).num_days())
                .unwrap_or(0),
            missed_installments: summary.missed_count,
            partial_installments: summary.partial_count,
        }
    }

    pub fn is_in_arrears(&self) -> bool {
        self.arrears.is_positive()
    }
}

/// installments rated missed
pub fn missed_payments(reconciliation: &Reconciliation) -> Vec<CollectionLine> {
    lines_with_rating(reconciliation, CollectionRating::Missed)
}

/// installments rated partial
pub fn partial_payments(reconciliation: &Reconciliation) -> Vec<CollectionLine> {
    lines_with_rating(reconciliation, CollectionRating::Partial)
}

fn lines_with_rating(reconciliation: &Reconciliation, rating: CollectionRating) -> Vec<CollectionLine> {
    let as_of = reconciliation.summary.as_of;
    reconciliation
        .with_rating(rating)
        .map(|r| CollectionLine {
            loan_id: reconciliation.loan_id(),
            installment_number: r.installment_number,
            due_date: r.due_date,
            expected_amount: r.expected_amount,
            amount_collected: r.amount_collected,
            shortfall: r.outstanding_for_period,
            rating,
            days_overdue: (as_of - r.due_date).num_days(),
        })
        .collect()
}

/// collection position across many loans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PortfolioSummary {
    pub loans: u32,
    pub loans_in_arrears: u32,
    pub total_gross_loans: Money,
    pub total_expected: Money,
    pub total_collected: Money,
    pub total_arrears: Money,
    pub total_default_fees: Money,
    pub missed_installments: u32,
    pub partial_installments: u32,
    /// collected over gross across the book, percent, clamped to 0..=100
    pub completion_percentage: Decimal,
}

impl PortfolioSummary {
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a LoanCollectionSummary>) -> Self {
        let mut portfolio = summaries
            .into_iter()
            .fold(PortfolioSummary::default(), |mut acc, s| {
                acc.loans += 1;
                if s.arrears.is_positive() {
                    acc.loans_in_arrears += 1;
                }
                acc.total_gross_loans += s.gross_loan;
                acc.total_expected += s.total_expected;
                acc.total_collected += s.total_collected;
                acc.total_arrears += s.arrears;
                acc.total_default_fees += s.default_fees_accrued;
                acc.missed_installments += s.missed_count;
                acc.partial_installments += s.partial_count;
                acc
            });

        portfolio.completion_percentage = portfolio
            .total_collected
            .percentage_of(portfolio.total_gross_loans)
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        portfolio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;
    use crate::quote::LoanQuoteCalculator;
    use crate::reconcile::{PaymentEvent, ReconciliationEngine};
    use crate::schedule::{RepaymentSchedule, ScheduleGenerator};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(principal: i64) -> RepaymentSchedule {
        let contract = LoanQuoteCalculator::default()
            .quote(Money::from_major(principal), 6)
            .unwrap();
        ScheduleGenerator::default().generate(&contract, date(2024, 1, 1)).unwrap()
    }

    fn paid_in_full(schedule: &RepaymentSchedule, installments: usize) -> Vec<PaymentEvent> {
        schedule.entries()[..installments]
            .iter()
            .map(|e| PaymentEvent::new(schedule.loan_id(), e.total_payment, e.payment_date, "").unwrap())
            .collect()
    }

    #[test]
    fn test_arrears_report() {
        let schedule = schedule(1_000);
        let mut payments = paid_in_full(&schedule, 1);
        payments.push(
            PaymentEvent::new(schedule.loan_id(), Money::from_major(50), date(2024, 1, 29), "").unwrap(),
        );
        let engine = ReconciliationEngine::new(CollectionConfig::default().with_default_fee(Money::from_major(20)));

        // installments on Jan 1, 15, 29 are due by Feb 5
        let reconciliation = engine.reconcile(&schedule, &payments, date(2024, 2, 5)).unwrap();
        let report = ArrearsReport::from_reconciliation(&reconciliation);

        assert!(report.is_in_arrears());
        assert_eq!(report.oldest_unpaid_due_date, Some(date(2024, 1, 15)));
        assert_eq!(report.days_in_arrears, 21);
        assert_eq!(report.missed_installments, 1);
        assert_eq!(report.partial_installments, 1);
        assert_eq!(report.default_fees_accrued, Money::from_major(20));
        assert_eq!(report.total_overdue, report.arrears + Money::from_major(20));

        let missed = missed_payments(&reconciliation);
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].installment_number, 2);
        assert_eq!(missed[0].shortfall, missed[0].expected_amount);

        let partial = partial_payments(&reconciliation);
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].amount_collected, Money::from_major(50));
        assert_eq!(partial[0].days_overdue, 7);
    }

    #[test]
    fn test_current_loan_has_no_arrears() {
        let schedule = schedule(1_000);
        let payments = paid_in_full(&schedule, 2);
        let reconciliation = ReconciliationEngine::default()
            .reconcile(&schedule, &payments, date(2024, 1, 20))
            .unwrap();

        let report = ArrearsReport::from_reconciliation(&reconciliation);
        assert!(!report.is_in_arrears());
        assert_eq!(report.oldest_unpaid_due_date, None);
        assert_eq!(report.days_in_arrears, 0);
        assert!(missed_payments(&reconciliation).is_empty());
    }

    #[test]
    fn test_portfolio_rollup() {
        let engine = ReconciliationEngine::default();
        let current = schedule(1_000);
        let behind = schedule(2_000);
        let as_of = date(2024, 1, 20);

        let summaries = [
            engine.reconcile(&current, &paid_in_full(&current, 2), as_of).unwrap().summary,
            engine.reconcile(&behind, &[], as_of).unwrap().summary,
        ];
        let portfolio = PortfolioSummary::from_summaries(&summaries);

        assert_eq!(portfolio.loans, 2);
        assert_eq!(portfolio.loans_in_arrears, 1);
        assert_eq!(portfolio.missed_installments, 2);
        assert_eq!(portfolio.total_gross_loans, current.gross_loan() + behind.gross_loan());
        assert_eq!(portfolio.total_arrears, summaries[1].arrears);
        assert!(portfolio.completion_percentage > dec!(0));
        assert!(portfolio.completion_percentage < dec!(100));

        let empty = PortfolioSummary::from_summaries(&Vec::<LoanCollectionSummary>::new());
        assert_eq!(empty.loans, 0);
        assert_eq!(empty.completion_percentage, dec!(0));
    }
}
