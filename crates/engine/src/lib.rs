pub use balances::compute_balances;
pub use commands::{ExpenseCmd, PersonalExpenseCmd, SettlementCmd, TxMeta};
pub use error::EngineError;
pub use groups::Group;
pub use money::{MINOR_UNIT_EXPONENT, Money};
pub use ops::{Engine, EngineBuilder, TransactionListFilter};
pub use settle::{Transfer, plan_settlements};
pub use splits::{Split, validate_splits};
pub use store::{GroupSnapshot, LedgerStore, Settlement, SettlementPlan, SplitRecord};
pub use transactions::{Transaction, TransactionKind};

mod balances;
mod commands;
mod error;
mod group_memberships;
mod groups;
mod money;
mod ops;
mod settle;
mod splits;
mod store;
mod transactions;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
