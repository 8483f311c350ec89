//! disparity-trader: retrospective evaluator for a Disparity Index crossover
//! strategy.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line orchestration in
//! [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
