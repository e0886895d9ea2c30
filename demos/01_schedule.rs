/// schedule - expand a contract into dated fortnightly installments
use loan_reconciliation_rs::chrono::NaiveDate;
use loan_reconciliation_rs::{LoanQuoteCalculator, Money, ScheduleGenerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let contract = LoanQuoteCalculator::default().quote(Money::from_major(2_500), 8)?;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let schedule = ScheduleGenerator::default().generate(&contract, start)?;

    println!("=== schedule for gross loan {} ===\n", contract.gross_loan());
    println!("{:>3}  {:<10}  {:>10}  {:>8}  {:>6}  {:>10}  {:>10}", "#", "date", "principal", "interest", "tax", "payment", "balance");
    for entry in schedule.entries() {
        println!(
            "{:>3}  {:<10}  {:>10}  {:>8}  {:>6}  {:>10}  {:>10}",
            entry.installment_number,
            entry.payment_date,
            entry.principal_amount,
            entry.interest_amount,
            entry.tax_amount,
            entry.total_payment,
            entry.remaining_balance
        );
    }
    println!("\ntotal payable: {}", schedule.total_payable());

    Ok(())
}
