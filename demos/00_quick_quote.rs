/// quick quote - price a loan from principal and term
use loan_reconciliation_rs::{LoanQuoteCalculator, Money};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let calculator = LoanQuoteCalculator::default();
    let contract = calculator.quote(Money::from_major(10_000), 12)?;

    println!("=== quote ===\n");
    println!("principal:        {}", contract.principal());
    println!("rate:             {}", contract.interest_rate());
    println!("interest:         {}", contract.interest_amount());
    println!("risk insurance:   {}", contract.risk_insurance_amount());
    println!("documentation:    {}", contract.documentation_fee());
    println!("gross loan:       {}", contract.gross_loan());
    println!("per fortnight:    {}", contract.fortnightly_installment());

    // unlisted terms are rejected, never defaulted
    if let Err(e) = calculator.quote(Money::from_major(10_000), 11) {
        println!("\n11 fortnights: {}", e);
    }

    Ok(())
}
