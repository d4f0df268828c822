pub mod actions;
pub mod comments;
pub mod completion;
pub mod config;
pub mod decisions;
pub mod error;
pub mod monitor;
pub mod persistence;
pub mod projection;
pub mod reducer;
pub mod roles;
pub mod state;
pub mod workflow;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub use completion::*;
pub use decisions::*;
pub use error::QuireError;
pub use monitor::*;
pub use persistence::*;
pub use projection::*;
pub use roles::*;
pub use workflow::*;
