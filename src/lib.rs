//! Purpose: Library crate backing the `solver-harness` binary and its tests.
//! Exports: `core` (case discovery, solver gateway, run driver, errors) and `api`.
//! Role: Feeds JSON case files to a native solver library over a C ABI.
//! Invariants: Case content is forwarded verbatim; the harness never parses it.
//! Invariants: All foreign calls go through `core::gateway`.
pub mod api;
pub mod core;
