//! Voice clip generation.
//!
//! Composes dialogue generation with speech synthesis: ask the chat model
//! for a line the character would say, then synthesize it with the
//! character's voice.

use std::path::PathBuf;

use crate::backends::chat::ChatCompletion;
use crate::backends::tts::ElevenLabsTts;
use crate::character::description::{extract_name, Description};
use crate::generators::text::{DialogueGenerator, DialogueTurn};
use crate::utilities::errors::GenerationError;

/// Dialogue + TTS pipeline producing a saved audio clip.
pub struct VoiceGenerator {
    text: DialogueGenerator,
    tts: ElevenLabsTts,
}

impl VoiceGenerator {
    /// Default pipeline: DeepSeek for the speech line, ElevenLabs for the
    /// audio.
    pub fn new() -> Self {
        Self {
            text: DialogueGenerator::new(ChatCompletion::deepseek()),
            tts: ElevenLabsTts::new(),
        }
    }

    /// Pipeline over explicit parts.
    pub fn with_parts(text: DialogueGenerator, tts: ElevenLabsTts) -> Self {
        Self { text, tts }
    }

    /// Generate a sample speech line for the character and synthesize it.
    ///
    /// Returns the path of the saved audio file.
    ///
    /// # Errors
    /// Fails when dialogue generation fails, the reply carries no
    /// `SampleSpeech`, or synthesis/saving fails.
    pub async fn generate_voice(
        &mut self,
        description: &Description,
        dialogues: &[DialogueTurn],
        character_name: Option<&str>,
        output_path: Option<PathBuf>,
    ) -> Result<PathBuf, GenerationError> {
        log::info!("voice: generating sample speech from persona and dialogues");
        let speech = self
            .text
            .generate_sample_speech(dialogues, description, character_name)
            .await?;

        let character_name = match character_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => extract_name(description),
        };

        log::info!("voice: synthesizing for {character_name}");
        self.tts
            .synthesize(&speech, &character_name, output_path)
            .await
    }
}

impl Default for VoiceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
