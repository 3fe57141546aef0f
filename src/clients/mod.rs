pub mod openai_images;
pub mod provider;
pub mod studio_client;
pub mod vision_client;

pub use openai_images::{ImageGenerationParams, OpenAiImagesClient};
pub use provider::{ExportProvider, GenerationProvider, Providers, VerificationProvider};
pub use studio_client::StudioClient;
pub use vision_client::VisionClient;
