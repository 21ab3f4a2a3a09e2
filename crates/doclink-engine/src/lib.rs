//! DocLink engine - metadata graph and column rendering
//!
//! This crate holds the in-memory side of the toolkit:
//! - Metadata graph populated from any backend, with lookups and selection
//! - Stored procedure bookkeeping
//! - Staging column accumulation and rendering
//! - Auto-included column heuristics

pub mod columns;
pub mod error;
pub mod graph;
pub mod renderer;

pub use error::GraphError;
pub use graph::{ActivityScope, MetadataGraph, Selection, WorkflowChain, WorkflowChainNames};
pub use renderer::{ColumnSet, ColumnSetRenderer, RenderPass, RenderedColumns};
