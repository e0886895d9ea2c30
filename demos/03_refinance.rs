/// refinance - replace a contract without touching the old one
use loan_reconciliation_rs::chrono::NaiveDate;
use loan_reconciliation_rs::{EventStore, LoanQuoteCalculator, Money, ScheduleGenerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let calculator = LoanQuoteCalculator::default();
    let generator = ScheduleGenerator::default();
    let mut events = EventStore::new();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let original = calculator.quote(Money::from_major(3_000), 10)?;
    let original_schedule = generator.generate(&original, start)?;

    // four installments in, the borrower tops up by 1,500 over 16 fortnights
    let outstanding = original_schedule.balance_after(4);
    let refinanced = calculator.refinance(&original, outstanding, Money::from_major(1_500), 16, &mut events)?;
    let restart = original_schedule.entry(5).map(|e| e.payment_date).ok_or("short schedule")?;
    let new_schedule = generator.generate_into(&refinanced, restart, &mut events)?;

    println!("original loan {}: gross {}", original.loan_id(), original.gross_loan());
    println!("carried balance: {}", outstanding);
    println!("new loan {}: gross {}, {} installments from {}",
        refinanced.loan_id(), refinanced.gross_loan(), new_schedule.len(), restart);
    println!("refinanced from: {:?}", refinanced.refinanced_from());
    println!("old schedule untouched: {} installments", original_schedule.len());

    Ok(())
}
