pub mod activity;
pub mod caps;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod record;
pub mod rewards;
pub mod serde_yuan;
pub mod store;
pub mod types;
