//! Thin clients for the external generation backends.
//!
//! Each client owns one narrow request/response contract: chat completion,
//! diffusion imaging, speech synthesis, image hosting, or talking-avatar
//! video. Credentials come from the environment; nothing here touches
//! character or rotation state.

pub mod avatar_video;
pub mod chat;
pub mod diffusion;
pub mod image_host;
pub mod tts;

pub use avatar_video::{VideoOptions, VideoResult, VisionStory};
pub use chat::{ChatCompletion, ChatMessage};
pub use diffusion::{DiffusionMode, StableDiffusion};
pub use tts::ElevenLabsTts;
