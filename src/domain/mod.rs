mod employee;
mod issue;
mod ledger;
mod summary;

pub use employee::*;
pub use issue::*;
pub use ledger::*;
pub use summary::*;
