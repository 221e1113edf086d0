//! Tooling primitives for behaviour-tree execution.
//!
//! The runtime emits small, deterministic trace events (node enter/exit/abort, tree results) into a
//! user-provided sink. Rendering and inspection live in whatever consumes the sink.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    tags, NullTraceSink, SharedTraceLog, TraceEvent, TraceLog, TraceSink, VecTraceSink,
};
