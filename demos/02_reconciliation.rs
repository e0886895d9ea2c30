/// reconciliation - rate installments against observed payments
use loan_reconciliation_rs::chrono::{NaiveDate, TimeZone, Utc};
use loan_reconciliation_rs::reports::{missed_payments, ArrearsReport};
use loan_reconciliation_rs::{
    CollectionConfig, EventStore, LoanQuoteCalculator, Money, PaymentEvent, ReconciliationEngine,
    SafeTimeProvider, ScheduleGenerator, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let contract = LoanQuoteCalculator::default().quote(Money::from_major(10_000), 12)?;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let schedule = ScheduleGenerator::default().generate(&contract, start)?;

    let entries = schedule.entries();
    let payments = vec![
        PaymentEvent::new(contract.loan_id(), entries[0].total_payment, entries[0].payment_date, "cash")?,
        PaymentEvent::new(contract.loan_id(), Money::from_major(600), entries[2].payment_date, "salary deduction")?,
    ];

    // "today" comes from an injected clock, never from inside the engine
    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 2, 20, 9, 0, 0).unwrap()));
    let engine = ReconciliationEngine::new(CollectionConfig::default().with_default_fee(Money::from_major(25)));

    let mut events = EventStore::new();
    let as_of = time.now().date_naive();
    let reconciliation = engine.reconcile_into(&schedule, &payments, as_of, &mut events)?;

    println!("=== reconciliation as of {} ===\n", as_of);
    for result in reconciliation.results.iter().filter(|r| r.is_due()) {
        println!(
            "  #{:<2} {}  expected {:>8}  collected {:>8}  {:?}",
            result.installment_number,
            result.due_date,
            result.expected_amount,
            result.amount_collected,
            result.collection_rating()
        );
    }

    let report = ArrearsReport::from_reconciliation(&reconciliation);
    println!("\narrears:      {}", report.arrears);
    println!("default fees: {}", report.default_fees_accrued);
    println!("days behind:  {}", report.days_in_arrears);
    println!("completion:   {}%", reconciliation.summary.completion_percentage);
    println!("post-dated:   {}", reconciliation.summary.not_yet_received);
    println!("missed lines: {}", missed_payments(&reconciliation).len());
    println!("events:       {}", events.len());

    Ok(())
}
