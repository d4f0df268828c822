pub mod adapters;
pub mod contracts;
pub mod executor;
pub mod retry;
pub mod simulated;

pub use adapters::*;
pub use contracts::*;
pub use executor::*;
pub use retry::*;
pub use simulated::*;
