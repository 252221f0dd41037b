//! Gemini-backed AI impact analysis for the Deplyx Platform
//!
//! Implements the [`AiAnalysisClient`] contract over the Gemini
//! `generateContent` REST API, with bounded retries for truncated and
//! rate-limited responses and an ordered model fallback list. Every failure
//! degrades to "no AI result"; callers fall back to graph-only analysis.
//!
//! [`AiAnalysisClient`]: deplyx_interfaces::AiAnalysisClient

#![forbid(unsafe_code)]

mod client;
mod prompt;

pub use client::{GeminiAnalysisClient, GeminiConfig};
