//! # `spanrs`
//!
//! `spanrs` serves minimum spanning tree analysis over a plain-text TCP
//! protocol, on top of a small task execution substrate.
//!
//! ## Example
//!
//! ```rust
//! use spanrs::work::{Pipeline, Task};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.add_task(Task::relay("parse".into())).unwrap();
//! pipeline.add_task(Task::relay("render".into())).unwrap();
//! pipeline.start().unwrap();
//!
//! let value = pipeline.execute("A").unwrap().wait().unwrap();
//! assert_eq!(value, "A");
//! pipeline.stop();
//! ```
//!
//! ## Features
//!
//! - Active objects chained into pipelines
//! - A leader/followers worker pool
//! - Prim, Kruskal, Borůvka, Tarjan and integer MST solvers
//! - A line-protocol server running on either execution strategy

#![doc = include_str!("../README.md")]

pub mod error;
pub mod graph;
pub mod server;
pub mod work;

pub use error::{Error, Result};
pub use graph::{Algorithm, Graph, MstAnalysis};
pub use work::{ActiveObject, LeaderFollowers, Pipeline, Task};
