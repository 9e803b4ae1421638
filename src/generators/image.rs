//! Portrait image generation.
//!
//! Builds a front-facing portrait prompt from a canonical description and
//! hands it to the diffusion backend. In image-guided mode the local init
//! image is first published to the image host, since the backend only
//! accepts public URLs.

use std::path::{Path, PathBuf};

use crate::backends::diffusion::{DiffusionMode, StableDiffusion};
use crate::backends::image_host;
use crate::character::description::{extract_name, Description};
use crate::utilities::errors::GenerationError;
use crate::utilities::prompts::build_front_facing_prompt;

/// A finished portrait.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Public URL of the generated image.
    pub image_url: String,
    /// Character name the portrait was generated for.
    pub character_name: String,
}

/// Diffusion-backed portrait generator.
pub struct ImageGenerator {
    backend: StableDiffusion,
}

impl ImageGenerator {
    /// Create a generator in the given mode, configured from the
    /// environment.
    pub fn new(mode: DiffusionMode) -> Self {
        Self {
            backend: StableDiffusion::new(mode),
        }
    }

    /// Create a generator over a pre-configured backend.
    pub fn with_backend(backend: StableDiffusion) -> Self {
        Self { backend }
    }

    pub fn mode(&self) -> DiffusionMode {
        self.backend.mode()
    }

    /// Generate a portrait for `description`.
    ///
    /// The character name is taken from `character_name` when given,
    /// otherwise extracted from the description ("unknown" is acceptable
    /// here — it only feeds logging and file naming). `init_image_path`
    /// is required in img2img mode and ignored otherwise.
    ///
    /// # Errors
    /// Fails when the description is empty, the init image is missing or
    /// cannot be published, or the diffusion backend fails.
    pub async fn generate_image(
        &self,
        description: &Description,
        character_name: Option<&str>,
        init_image_path: Option<&Path>,
        output_path: Option<PathBuf>,
    ) -> Result<GeneratedImage, GenerationError> {
        if description.is_empty() {
            return Err(GenerationError::MissingDescription);
        }

        let character_name = match character_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => extract_name(description),
        };

        let prompt = build_front_facing_prompt(description);

        let init_image_url = if self.backend.mode() == DiffusionMode::Img2Img {
            let path = init_image_path.ok_or_else(|| GenerationError::InvalidInitImage {
                path: "<none>".to_string(),
            })?;
            if !path.exists() {
                return Err(GenerationError::InvalidInitImage {
                    path: path.display().to_string(),
                });
            }
            let url = image_host::upload_image(path).await?;
            log::info!("image: init image published at {url}");
            Some(url)
        } else {
            None
        };

        log::info!(
            "image: generating {} portrait for {character_name}",
            self.backend.mode().as_str()
        );
        let image_url = self
            .backend
            .generate(
                &prompt,
                &character_name,
                init_image_url.as_deref(),
                output_path,
            )
            .await?;

        Ok(GeneratedImage {
            image_url,
            character_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn airi() -> Description {
        vec![json!({"Name": "Airi"}), json!({"Gender": "Female"})]
    }

    #[tokio::test]
    async fn empty_description_is_rejected() {
        let gen = ImageGenerator::new(DiffusionMode::Text2Img);
        let err = gen
            .generate_image(&Vec::new(), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingDescription));
    }

    #[tokio::test]
    async fn img2img_without_an_init_image_is_rejected() {
        let gen = ImageGenerator::new(DiffusionMode::Img2Img);
        let err = gen
            .generate_image(&airi(), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInitImage { .. }));
    }

    #[tokio::test]
    async fn img2img_with_a_missing_file_is_rejected() {
        let gen = ImageGenerator::new(DiffusionMode::Img2Img);
        let err = gen
            .generate_image(
                &airi(),
                None,
                Some(Path::new("/definitely/not/here.png")),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInitImage { .. }));
    }
}
