pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod quote;
pub mod rates;
pub mod reconcile;
pub mod reports;
pub mod schedule;
pub mod types;

// re-export key types
pub use config::{CollectionConfig, EngineConfig, QuoteConfig, ScheduleConfig};
pub use decimal::{Money, Rate};
pub use errors::{EngineError, Result};
pub use events::{Event, EventStore};
pub use quote::{ContractRecord, LoanContract, LoanQuoteCalculator};
pub use rates::{RateTable, RateTableEntry};
pub use reconcile::{
    LoanCollectionSummary, PaymentEvent, PaymentRecord, Reconciliation, ReconciliationEngine,
    ReconciliationResult,
};
pub use reports::{ArrearsReport, CollectionLine, PortfolioSummary};
pub use schedule::{RepaymentSchedule, ScheduleEntry, ScheduleGenerator, ScheduleRecord};
pub use types::{CollectionRating, InstallmentNumber, InstallmentState, LoanId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
