//! Talking-head video generation.
//!
//! The full pipeline: generate a speech line and a portrait for the
//! character, upload the portrait as a named avatar, then drive the avatar
//! with the speech text (or an existing audio clip) and poll until the
//! video is ready.

use std::path::Path;

use crate::backends::avatar_video::{VideoOptions, VisionStory};
use crate::backends::diffusion::DiffusionMode;
use crate::character::description::{extract_name, Description};
use crate::generators::image::ImageGenerator;
use crate::generators::text::{DialogueGenerator, DialogueTurn};
use crate::utilities::errors::GenerationError;

/// A finished talking-head video and the intermediate artifacts that
/// produced it.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub video_url: String,
    pub avatar_id: String,
    /// The spoken line.
    pub text: String,
    /// Public URL of the portrait the avatar was built from.
    pub image_url: String,
}

/// Dialogue + portrait + avatar-video pipeline.
pub struct VideoGenerator {
    text: DialogueGenerator,
    image: ImageGenerator,
    backend: VisionStory,
    /// Rendering options applied to every request.
    pub options: VideoOptions,
}

impl VideoGenerator {
    /// Default pipeline: Moonshot dialogue, text2img portrait, VisionStory
    /// video.
    pub fn new() -> Self {
        Self {
            text: DialogueGenerator::moonshot(),
            image: ImageGenerator::new(DiffusionMode::Text2Img),
            backend: VisionStory::new(),
            options: VideoOptions::default(),
        }
    }

    /// Pipeline over explicit parts.
    pub fn with_parts(
        text: DialogueGenerator,
        image: ImageGenerator,
        backend: VisionStory,
        options: VideoOptions,
    ) -> Self {
        Self {
            text,
            image,
            backend,
            options,
        }
    }

    /// Run the full prompt-to-video pipeline for a character.
    ///
    /// # Errors
    /// Fails when any stage fails: dialogue, portrait, avatar upload,
    /// video creation, or status polling.
    pub async fn generate_from_prompt(
        &mut self,
        dialogues: &[DialogueTurn],
        description: &Description,
        avatar_name: &str,
    ) -> Result<GeneratedVideo, GenerationError> {
        let character_name = extract_name(description);

        log::info!("video: generating speech line for {character_name}");
        let text = self
            .text
            .generate_sample_speech(dialogues, description, Some(&character_name))
            .await?;

        log::info!("video: generating portrait for {character_name}");
        let portrait = self
            .image
            .generate_image(description, Some(&character_name), None, None)
            .await?;

        log::info!("video: uploading avatar {avatar_name:?}");
        let avatar_id = self
            .backend
            .upload_avatar(&portrait.image_url, avatar_name)
            .await?;

        log::info!("video: requesting video for avatar {avatar_id}");
        let video_id = self
            .backend
            .generate_video_with_text(&text, &avatar_id, &self.options)
            .await?;

        let result = self.backend.poll_video_status(&video_id).await?;

        Ok(GeneratedVideo {
            video_url: result.video_url,
            avatar_id,
            text,
            image_url: portrait.image_url,
        })
    }

    /// Drive an existing avatar with an uploaded audio clip and return the
    /// video URL.
    pub async fn generate_with_audio(
        &self,
        audio_path: &Path,
        avatar_id: &str,
    ) -> Result<String, GenerationError> {
        let video_id = self
            .backend
            .generate_video_with_audio(audio_path, avatar_id, &self.options)
            .await?;
        let result = self.backend.poll_video_status(&video_id).await?;
        Ok(result.video_url)
    }

    /// Drive an existing avatar with a literal text script and return the
    /// video URL.
    pub async fn generate_with_text(
        &self,
        text: &str,
        avatar_id: &str,
    ) -> Result<String, GenerationError> {
        let video_id = self
            .backend
            .generate_video_with_text(text, avatar_id, &self.options)
            .await?;
        let result = self.backend.poll_video_status(&video_id).await?;
        Ok(result.video_url)
    }
}

impl Default for VideoGenerator {
    fn default() -> Self {
        Self::new()
    }
}
