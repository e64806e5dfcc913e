//! Remote scoring on the asynchronous compute network.

mod backoff;
mod client;
mod data_item;
mod transport;
mod wallet;

pub use backoff::{await_task, Backoff, PollOutcome};
pub use client::{InferenceClient, Submission, Task};
pub use data_item::{sign_data_item, DataItem};
pub use transport::{AoGateway, ComputeNetwork, DryRunResult, OutboxMessage, Tag};
pub use wallet::Wallet;
