pub mod card;
pub mod clock;
pub mod config;
pub mod error;
pub mod inventory;
pub mod modifier;
pub mod progression;
pub mod queue;
pub mod reward;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod store;
