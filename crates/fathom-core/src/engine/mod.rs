//! The branching execution engine and its inference strategies.
//!
//! This module provides:
//! - **errors**: Error types for construction and execution failures
//! - **program**: Program steps and the `sample`/`factor`/`observe`/`done` primitives
//! - **context**: Path state, continuations, and the run loop
//! - **strategy**: The pluggable inference strategy trait
//! - **enumerate**, **weighted_queue**: Exact strategies over finite programs
//! - **sample_once**, **particle_filter**: Sampling-based strategies

pub mod context;
pub mod enumerate;
pub mod errors;
pub mod particle_filter;
pub mod program;
pub mod sample_once;
pub mod strategy;
pub mod weighted_queue;
