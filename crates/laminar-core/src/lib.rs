//! Laminar: a concurrent approximate nearest-neighbor index over fixed
//! dimensional vectors, built on a layered proximity graph.
//!
//! # Quick start
//!
//! ```
//! use laminar_core::{Index, HnswParams, distance::Euclidean};
//!
//! let index: Index<Euclidean> = Index::new(4, HnswParams::fast()).unwrap();
//! index.insert(1, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
//! index.insert(2, vec![1.0, 1.0, 2.0, 3.0]).unwrap();
//! let nearest = index.search(&[0.0, 1.0, 2.0, 3.1], 1);
//! assert_eq!(nearest, vec![1]);
//! ```
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod distance;
pub mod error;
pub mod graph;
mod persistence;

pub use config::{HnswParams, SearchConfig};
pub use error::{Error, Result};
pub use graph::{BatchInsertStats, BatchResult, CounterSnapshot, Index, NodeId};
