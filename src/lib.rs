//! # personaforge
//!
//! Backend library for virtual-character creation: normalize user-supplied
//! character descriptions, rotate non-repeating default personas per user,
//! and generate matching media — a portrait image, a line of spoken
//! dialogue, a synthesized voice clip, or a talking-head video — through
//! narrow contracts to external generation backends.
//!
//! The center of the crate is the [`CharacterPromptManager`]: given raw
//! description input of unknown shape it decides what description a
//! generation request actually uses, falling back to a per-user rotation
//! over the default persona catalog that never repeats a persona before
//! the whole catalog has been seen. The generators are independent
//! consumers of the resulting canonical description and share no state
//! with the rotation pipeline beyond it.

pub mod backends;
pub mod character;
pub mod generators;
pub mod utilities;

pub use backends::{ChatCompletion, ChatMessage, DiffusionMode, VideoOptions};
pub use character::{
    extract_value, extract_value_from_description, CharacterPromptManager, Description,
    RotationStore, StoreError, UNKNOWN_VALUE,
};
pub use character::store::{InMemoryRotationStore, SqliteRotationStore};
pub use generators::{
    DialogueGenerator, DialogueTurn, GeneratedImage, GeneratedVideo, ImageGenerator,
    VideoGenerator, VoiceGenerator,
};
pub use utilities::errors::GenerationError;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
