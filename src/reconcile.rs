use chrono::{Days, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use log::{debug, warn};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::{CollectionConfig, EngineConfig};
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::schedule::{RepaymentSchedule, ScheduleEntry};
use crate::types::{CollectionRating, InstallmentNumber, InstallmentState, LoanId};

/// an observed payment from a collection channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaymentRecord", into = "PaymentRecord")]
pub struct PaymentEvent {
    loan_reference: LoanId,
    amount: Money,
    payment_date: NaiveDate,
    source_notes: String,
}

/// persistence-shaped payment, validated on the way in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub loan_reference: LoanId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub source_notes: String,
}

impl PaymentEvent {
    /// record a payment; zero amounts are accepted, negative or sub-cent ones are not
    pub fn new(
        loan_reference: LoanId,
        amount: Money,
        payment_date: NaiveDate,
        source_notes: impl Into<String>,
    ) -> Result<Self> {
        if amount.is_negative() {
            return Err(EngineError::invalid_input("amount", "payment amount cannot be negative"));
        }
        if !amount.is_whole_cents() {
            return Err(EngineError::invalid_input("amount", "payment amount must be whole cents"));
        }
        Ok(Self {
            loan_reference,
            amount,
            payment_date,
            source_notes: source_notes.into(),
        })
    }

    pub fn loan_reference(&self) -> LoanId {
        self.loan_reference
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn payment_date(&self) -> NaiveDate {
        self.payment_date
    }

    pub fn source_notes(&self) -> &str {
        &self.source_notes
    }
}

impl TryFrom<PaymentRecord> for PaymentEvent {
    type Error = EngineError;

    fn try_from(record: PaymentRecord) -> Result<Self> {
        PaymentEvent::new(record.loan_reference, record.amount, record.payment_date, record.source_notes)
    }
}

impl From<PaymentEvent> for PaymentRecord {
    fn from(payment: PaymentEvent) -> Self {
        PaymentRecord {
            loan_reference: payment.loan_reference,
            amount: payment.amount,
            payment_date: payment.payment_date,
            source_notes: payment.source_notes,
        }
    }
}

/// allocation outcome for one installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub installment_number: InstallmentNumber,
    pub due_date: NaiveDate,
    pub expected_amount: Money,
    pub amount_collected: Money,
    pub outstanding_for_period: Money,
    pub state: InstallmentState,
}

impl ReconciliationResult {
    /// rating once the matching window has closed
    pub fn collection_rating(&self) -> Option<CollectionRating> {
        self.state.rating()
    }

    pub fn is_due(&self) -> bool {
        self.state.is_due()
    }
}

/// aggregate collection position of one loan as of a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCollectionSummary {
    pub loan_id: LoanId,
    pub as_of: NaiveDate,
    pub gross_loan: Money,
    pub installments_due: u32,
    /// sum of total payments over installments whose window has closed
    pub total_expected: Money,
    /// every payment received by `as_of`, including unapplied money
    pub total_collected: Money,
    pub arrears: Money,
    pub default_fees_accrued: Money,
    /// collected over gross loan, percent, clamped to 0..=100
    pub completion_percentage: Decimal,
    pub full_count: u32,
    pub partial_count: u32,
    pub missed_count: u32,
    /// received after the final installment was filled or its window closed
    pub unapplied: Money,
    /// collected beyond expected plus the overpayment tolerance; zero otherwise
    pub overpayment: Money,
    /// payments dated after `as_of`; excluded from every other figure
    pub not_yet_received: Money,
}

/// per-installment results plus the loan summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub results: Vec<ReconciliationResult>,
    pub summary: LoanCollectionSummary,
}

impl Reconciliation {
    pub fn loan_id(&self) -> LoanId {
        self.summary.loan_id
    }

    /// rated results with the given rating, in installment order
    pub fn with_rating(&self, rating: CollectionRating) -> impl Iterator<Item = &ReconciliationResult> {
        self.results
            .iter()
            .filter(move |r| r.collection_rating() == Some(rating))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// matches payments to installments and rates each installment
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: CollectionConfig,
}

impl ReconciliationEngine {
    pub fn new(config: CollectionConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.collection.clone())
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Reconcile payments against a schedule as of a given date.
    ///
    /// Payments are taken in date order. Each one first closes every installment
    /// whose window (`due + grace_days`) ended before the payment date, then fills
    /// the earliest open installment, carrying any overflow forward. Money is never
    /// moved back to an installment whose window has closed; money left after the
    /// final installment is reported as unapplied.
    ///
    /// Payments dated after `as_of` are not allocated; their total is reported as
    /// `not_yet_received`. An installment is rated once its window has passed, that
    /// is when `due + grace_days < as_of`, so a payment made on the last day of the
    /// window still counts before the installment is rated.
    pub fn reconcile(
        &self,
        schedule: &RepaymentSchedule,
        payments: &[PaymentEvent],
        as_of: NaiveDate,
    ) -> Result<Reconciliation> {
        let entries = schedule.entries();
        if entries.is_empty() {
            return Err(EngineError::invalid_input("schedule", "schedule has no installments"));
        }

        for payment in payments {
            if payment.loan_reference != schedule.loan_id() {
                return Err(EngineError::MismatchedLoan {
                    expected: schedule.loan_id(),
                    found: payment.loan_reference,
                });
            }
        }

        let window_ends = entries
            .iter()
            .map(|e| self.window_end(e))
            .collect::<Result<Vec<_>>>()?;

        let allocation = allocate(entries, &window_ends, payments, as_of);

        let results: Vec<ReconciliationResult> = entries
            .iter()
            .zip(&allocation.collected)
            .zip(&window_ends)
            .map(|((entry, &amount_collected), &window_end)| {
                let state = if window_end < as_of {
                    InstallmentState::Rated(self.rate(entry.total_payment, amount_collected))
                } else {
                    InstallmentState::NotYetDue
                };
                ReconciliationResult {
                    installment_number: entry.installment_number,
                    due_date: entry.payment_date,
                    expected_amount: entry.total_payment,
                    amount_collected,
                    outstanding_for_period: entry.total_payment.saturating_sub(amount_collected),
                    state,
                }
            })
            .collect();

        let summary = self.summarize(schedule, &results, &allocation, as_of);

        debug!(
            "reconciled loan {} as of {}: expected {}, collected {}, arrears {}, {} missed, {} partial",
            summary.loan_id,
            as_of,
            summary.total_expected,
            summary.total_collected,
            summary.arrears,
            summary.missed_count,
            summary.partial_count
        );

        Ok(Reconciliation { results, summary })
    }

    /// reconcile and record one event per rated installment
    pub fn reconcile_into(
        &self,
        schedule: &RepaymentSchedule,
        payments: &[PaymentEvent],
        as_of: NaiveDate,
        events: &mut EventStore,
    ) -> Result<Reconciliation> {
        let reconciliation = self.reconcile(schedule, payments, as_of)?;
        let loan_id = schedule.loan_id();

        for result in &reconciliation.results {
            match result.collection_rating() {
                Some(CollectionRating::Full) => events.emit(Event::InstallmentCollected {
                    loan_id,
                    installment_number: result.installment_number,
                    due_date: result.due_date,
                    amount_collected: result.amount_collected,
                }),
                Some(CollectionRating::Partial) => events.emit(Event::InstallmentPartiallyPaid {
                    loan_id,
                    installment_number: result.installment_number,
                    due_date: result.due_date,
                    amount_collected: result.amount_collected,
                    shortfall: result.outstanding_for_period,
                }),
                Some(CollectionRating::Missed) => {
                    events.emit(Event::InstallmentMissed {
                        loan_id,
                        installment_number: result.installment_number,
                        due_date: result.due_date,
                        expected_amount: result.expected_amount,
                    });
                    if self.config.default_fee.is_positive() {
                        events.emit(Event::DefaultFeeAccrued {
                            loan_id,
                            installment_number: result.installment_number,
                            fee: self.config.default_fee,
                        });
                    }
                }
                None => {}
            }
        }

        if reconciliation.summary.unapplied.is_positive() {
            events.emit(Event::UnappliedFundsHeld {
                loan_id,
                amount: reconciliation.summary.unapplied,
            });
        }

        Ok(reconciliation)
    }

    /// reconcile as of the provider's current date
    pub fn reconcile_now(
        &self,
        schedule: &RepaymentSchedule,
        payments: &[PaymentEvent],
        time_provider: &SafeTimeProvider,
    ) -> Result<Reconciliation> {
        let as_of = time_provider.now().date_naive();
        self.reconcile(schedule, payments, as_of)
    }

    fn window_end(&self, entry: &ScheduleEntry) -> Result<NaiveDate> {
        entry
            .payment_date
            .checked_add_days(Days::new(u64::from(self.config.grace_days)))
            .ok_or_else(|| EngineError::invalid_input("grace_days", "matching window overflows the calendar"))
    }

    fn rate(&self, expected: Money, collected: Money) -> CollectionRating {
        if collected >= expected.saturating_sub(self.config.full_payment_tolerance) {
            CollectionRating::Full
        } else if collected.is_positive() {
            CollectionRating::Partial
        } else {
            CollectionRating::Missed
        }
    }

    fn summarize(
        &self,
        schedule: &RepaymentSchedule,
        results: &[ReconciliationResult],
        allocation: &Allocation,
        as_of: NaiveDate,
    ) -> LoanCollectionSummary {
        let unapplied = allocation.unapplied;
        let mut total_expected = Money::ZERO;
        let mut total_collected = unapplied;
        let (mut full_count, mut partial_count, mut missed_count) = (0u32, 0u32, 0u32);

        for result in results {
            total_collected += result.amount_collected;
            if let Some(rating) = result.collection_rating() {
                total_expected += result.expected_amount;
                match rating {
                    CollectionRating::Full => full_count += 1,
                    CollectionRating::Partial => partial_count += 1,
                    CollectionRating::Missed => missed_count += 1,
                }
            }
        }

        let gross_loan = schedule.gross_loan();
        let completion_percentage = total_collected
            .percentage_of(gross_loan)
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let overpayment = if total_collected > total_expected + self.config.overpayment_tolerance {
            total_collected - total_expected
        } else {
            Money::ZERO
        };
        if overpayment.is_positive() {
            warn!(
                "loan {} has collected {} ahead of the {} expected as of {}",
                schedule.loan_id(),
                overpayment,
                total_expected,
                as_of
            );
        }
        if unapplied.is_positive() {
            warn!("loan {} holds {} unapplied after the final installment", schedule.loan_id(), unapplied);
        }

        LoanCollectionSummary {
            loan_id: schedule.loan_id(),
            as_of,
            gross_loan,
            installments_due: full_count + partial_count + missed_count,
            total_expected,
            total_collected,
            arrears: total_expected.saturating_sub(total_collected),
            default_fees_accrued: self.config.default_fee * Decimal::from(missed_count),
            completion_percentage,
            full_count,
            partial_count,
            missed_count,
            unapplied,
            overpayment,
            not_yet_received: allocation.not_yet_received,
        }
    }
}

/// where the payments received by `as_of` ended up
struct Allocation {
    collected: Vec<Money>,
    unapplied: Money,
    not_yet_received: Money,
}

/// FIFO allocation of payments onto installments
fn allocate(
    entries: &[ScheduleEntry],
    window_ends: &[NaiveDate],
    payments: &[PaymentEvent],
    as_of: NaiveDate,
) -> Allocation {
    let (mut ordered, later): (Vec<&PaymentEvent>, Vec<&PaymentEvent>) =
        payments.iter().partition(|p| p.payment_date <= as_of);
    let not_yet_received: Money = later.iter().map(|p| p.amount).sum();
    // stable: same-day payments keep their order, which cannot change the totals
    ordered.sort_by_key(|p| p.payment_date);

    let mut collected = vec![Money::ZERO; entries.len()];
    let mut unapplied = Money::ZERO;
    let mut cursor = 0usize;

    for payment in ordered {
        while cursor < entries.len() && window_ends[cursor] < payment.payment_date {
            cursor += 1;
        }

        let mut remaining = payment.amount;
        while remaining.is_positive() && cursor < entries.len() {
            let open = entries[cursor].total_payment.saturating_sub(collected[cursor]);
            let applied = remaining.min(open);
            collected[cursor] += applied;
            remaining -= applied;

            if collected[cursor] >= entries[cursor].total_payment {
                cursor += 1;
            }
        }

        if remaining.is_positive() {
            debug!(
                "payment of {} on {} leaves {} with no open installment",
                payment.amount, payment.payment_date, remaining
            );
            unapplied += remaining;
        }
    }

    Allocation {
        collected,
        unapplied,
        not_yet_received,
    }
}
