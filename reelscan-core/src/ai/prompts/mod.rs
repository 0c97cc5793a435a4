//! AI prompt templates.

pub mod identify;

pub use identify::{render_identify_system_prompt, render_identify_user_prompt, IDENTIFY_PROMPT_NAME};
