//! # policy-forge – compliance policy generator
//!
//! Generates a set of three security policies (access control, acceptable
//! usage, incident response) for an organization and framework, and exports
//! them as PDFs bundled into one zip archive.
//!
//! The markdown → PDF pipeline stages are:
//!
//! 1. **Parse** – markdown → HTML → DOM tree → [`markdown::Block`]s ([`markdown`], [`dom`])
//! 2. **Flow** – single-cursor layout onto A4 pages with page breaks ([`flow`], [`table`])
//! 3. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! Around it sit [`generate`] (validation and the LLM client), [`export`]
//! (parallel rendering and zipping) and the HTTP API in [`server`].

pub mod dom;
pub mod error;
pub mod export;
pub mod flow;
pub mod fonts;
pub mod generate;
pub mod layout_config;
pub mod markdown;
pub mod pipeline;
pub mod policy;
pub mod prompts;
pub mod render;
pub mod server;
pub mod table;

// Re-exports for convenience
pub use error::{PolicyError, Result};
pub use export::{export_policies, ExportOptions, PolicyArchive};
pub use flow::{FlowContext, LayoutMode, LayoutOptions};
pub use pipeline::{generate_pdf, PipelineConfig};
pub use policy::{Framework, PolicyKind, PolicySet};
