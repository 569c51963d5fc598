//! Synchronous facade over the PulseAudio client API.
//!
//! `link` owns the threaded event loop and the context; `query` and
//! `commands` submit introspection reads and mutations under the loop
//! lock and block on per-operation completion channels; `convert` turns
//! callback-borrowed server data into owned values.

pub(crate) mod commands;
pub(crate) mod convert;
pub(crate) mod link;
pub(crate) mod query;

pub(crate) use link::PulseLink;
