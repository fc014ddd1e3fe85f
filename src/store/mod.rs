pub mod memory;
pub mod persistence;
pub mod ports;
pub mod types;

pub use memory::{ActivityPartition, MemoryAggregateStore};
pub use persistence::JsonFileAggregateStore;
pub use ports::AggregateStore;
pub use types::{AgentAggregate, OrderTypeTotals};
