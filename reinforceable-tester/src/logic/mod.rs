pub mod policy;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use policy::Strategy;
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use tester::*;
