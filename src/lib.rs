//! # Document Question Answering Service
//!
//! An HTTP service that ingests a pair of reference documents (a "source"
//! and a "target"), extracts their text, and answers free-form questions
//! about them by streaming a prompt through a remote generative model.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌──────────────┐   ┌───────────────────────────┐
//! │ Client │──▶│ Origin guard │──▶│  POST /upload-documents    │
//! └────────┘   │  + CORS      │   │  fetch ▸ parse ▸ publish   │──▶ DocumentStore
//!              │  (origin)    │   ├───────────────────────────┤        │
//!              └──────────────┘   │  POST /answer-question     │◀───────┘
//!                                 │  prompt ▸ stream ▸ collect │──▶ generative model
//!                                 └───────────────────────────┘
//! ```
//!
//! The document pair is process-wide state: each successful upload replaces
//! it whole, and each question reads one self-consistent snapshot of it.
//! PDF parsing and the generative model are collaborators behind the
//! [`extract::DocumentParser`] and [`generate::GenerativeClient`] traits so
//! tests can substitute them.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment configuration loaded once at startup |
//! | [`origin`] | Allowed-origin policy and authorization verdicts |
//! | [`store`] | The shared source/target document pair |
//! | [`extract`] | Byte-to-text document parsing |
//! | [`ingest`] | Fetch-and-parse pipeline feeding the store |
//! | [`generate`] | Prompt construction and streamed answer assembly |
//! | [`error`] | HTTP error taxonomy and JSON error bodies |
//! | [`server`] | Router, handlers, and CORS wiring |

pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod origin;
pub mod server;
pub mod store;
