//! # stdcheck
//!
//! An asynchronous, LLM-backed coding-standards review pipeline.
//!
//! Source files are submitted for automated standards review; a durable job
//! queue feeds a chunked analyzer whose findings are aggregated, synthesized
//! into a report, and cached by content fingerprint so identical content is
//! analyzed at most once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────────────────────────┐
//! │ submit   │──▶│ job queue │──▶│ consumer worker               │
//! │ (dedup)  │   │ (SQLite)  │   │ walk ▶ chunk ▶ analyze ▶ parse │
//! └────▲─────┘   └───────────┘   └───────────────┬───────────────┘
//!      │                                         ▼
//! ┌────┴────────┐                        ┌───────────────┐
//! │ report cache│◀───────────────────────│ aggregate +   │
//! │ (by digest) │                        │ synthesize    │
//! └─────────────┘                        └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stdcheck init                  # create database
//! stdcheck worker                # start the consumer (needs Ollama running)
//! stdcheck submit src/widget.cpp # fingerprint, dedup-check, enqueue
//! stdcheck report <fingerprint>  # fetch the finished report
//! stdcheck export <fingerprint>  # write the tabular artifact
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`fingerprint`] | Content fingerprinting for cache identity |
//! | [`chunk`] | Line-boundary source chunking |
//! | [`rules`] | The active coding-standards rule set |
//! | [`analyzer`] | Analysis backend abstraction (Ollama + disabled) |
//! | [`parse`] | Response line-grammar parser |
//! | [`aggregate`] | Per-job finding aggregation |
//! | [`report`] | Report model and synthesis |
//! | [`queue`] | Durable job queue |
//! | [`consumer`] | Supervised queue consumer worker |
//! | [`store`] | Content-addressed report cache |
//! | [`submit`] | Submission path (fingerprint, dedup, enqueue) |
//! | [`export`] | Tabular CSV export |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod analyzer;
pub mod chunk;
pub mod config;
pub mod consumer;
pub mod db;
pub mod export;
pub mod fingerprint;
pub mod migrate;
pub mod parse;
pub mod queue;
pub mod report;
pub mod rules;
pub mod store;
pub mod submit;
