//! Vision AI integration via the Gemini API.
//!
//! This module provides:
//! - `VisionClient` trait for abstracting the inference endpoint
//! - `GeminiClient` implementation with retrying requests and disk caching
//! - Configuration via environment variables
//! - Prompt templates and response interpretation
//!
//! # Configuration
//!
//! Set these environment variables:
//!
//! - `GEMINI_API_KEY` (required unless offline): Your Gemini API key
//! - `REELSCAN_AI_MODEL` (optional): Model name, e.g., "gemini-2.5-flash"
//! - `REELSCAN_AI_BASE_URL` (optional): API base URL
//! - `REELSCAN_AI_CACHE_DIR` (optional): Cache directory path, or "none"
//! - `REELSCAN_AI_OFFLINE` (optional): Set to "true" to use cache only
//! - `REELSCAN_MAX_ATTEMPTS`, `REELSCAN_BASE_DELAY_MS`, `REELSCAN_RETRY_REJECTED`,
//!   `REELSCAN_HTTP_TIMEOUT_SECS` (optional): retry and timeout tuning
//!
//! # Example
//!
//! ```ignore
//! use reelscan_core::ai::{identify_movie, GeminiClient};
//!
//! let client = GeminiClient::from_env()?;
//! let outcome = identify_movie(&client, image).await?;
//! println!("{} ({})", outcome.result.title, outcome.result.release_year);
//! ```

mod cache;
mod client;
mod config;
mod fake;
mod identify;
pub mod prompts;
mod types;

pub use cache::{AiCache, CacheKey, CacheStats, CachedAiResponse};
pub use client::{GeminiClient, SetupError, VisionClient};
pub use config::{AiConfig, ConfigError, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use fake::FakeVisionClient;
pub use identify::{build_identify_request, identify_movie, interpret_response};
pub use types::{
    Candidate, CandidateContent, GenerateContentRequest, GenerateContentResponse,
    GroundingMetadata, ResponsePart, WebReference, WebSource,
};
