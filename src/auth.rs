//! Token model, the client-credentials exchange, and the staleness guard in front of it.

pub mod exchange;
pub mod guard;
pub mod token;

pub use exchange::*;
pub use guard::*;
pub use token::{record::*, secret::*};
