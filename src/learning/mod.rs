//! Feedback learning: a tabular Q-learning agent whose values bias future
//! scoring, and aggregation of reward updates computed elsewhere.

pub mod federated;
pub mod qagent;

pub use federated::{aggregate, FederatedAggregate, FederatedUpdate};
pub use qagent::{BillingMode, QAction, QEntry, QState, QUpdate, QuotaHealth, Reward, RoutingQAgent, TaskType};
