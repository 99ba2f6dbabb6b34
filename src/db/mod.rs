pub mod connection;

pub use connection::{PollStore, StoreConfig};
