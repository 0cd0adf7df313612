//! # repo-assistant
//!
//! A Rust service for understanding codebases through AI-generated file
//! summaries with confidence-gated retrieval.
//!
//! ## Architecture
//!
//! Ingestion and query serving form two pipelines over a shared summary
//! store:
//!
//! ```text
//!  Ingestion
//!  ┌────────────┐   ┌──────────────────────────┐   ┌───────────────┐
//!  │  Collector  │──▶│ Parallel Summarization   │──▶│ Summary Store │
//!  │ (dir / zip) │   │ (semaphore-bounded LLM   │   │ (embeddings + │
//!  └────────────┘   │  fan-out, per-file        │   │  JSON persist)│
//!                   │  failure isolation)       │   └───────┬───────┘
//!                   └──────────────────────────┘           │
//!  Query serving                                           ▼
//!  ┌────────────┐   ┌──────────────────────────┐   ┌───────────────┐
//!  │ User query  │──▶│ Confidence-Gated Router  │──▶│  FAST_ANSWER  │
//!  └────────────┘   │  retrieve top-K, score,  │   │ (from stored  │
//!                   │  compare to threshold    │   │  summaries)   │
//!                   └────────────┬─────────────┘   └───────────────┘
//!                                │ low confidence
//!                                ▼
//!                   ┌──────────────────────────┐
//!                   │ ESCALATED: tool-augmented│
//!                   │ LLM conversation over     │
//!                   │ raw file content          │
//!                   └──────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration: data dir, LLM settings,
//!   concurrency cap, routing thresholds
//! - [`models`] - Shared data types: `SourceFile`, `SummaryRecord`,
//!   `SummaryHit`, `IngestStatus`, request/response types
//! - [`collect`] - Directory walking, ignore/allow filtering, zip extraction
//! - [`summarize`] - Per-language prompt templates, heuristic fallback,
//!   classification and complexity scoring
//! - [`llm`] - Completion, embedding, and tool-chat clients for Ollama and
//!   OpenAI-compatible APIs
//! - [`ingest`] - Bounded-concurrency summarization coordinator with
//!   progress reporting and post-fan-in store writes
//! - [`store`] - Persistent summary collection with cosine-similarity search
//!   and keyword fallback
//! - [`router`] - Confidence scoring and the fast-answer/escalation decision
//! - [`agent`] - Read-only tool surface and the escalated tool-calling
//!   conversation
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state and the persisted file catalog

pub mod agent;
pub mod api;
pub mod collect;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod router;
pub mod state;
pub mod store;
pub mod summarize;
