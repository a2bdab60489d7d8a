// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "graph/mod.rs"]
pub mod graph;

#[cfg(test)]
#[path = "test_server.rs"]
pub mod test_server;
