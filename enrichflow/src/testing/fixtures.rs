//! Test fixtures for chains and enrichment commands.

use std::sync::Arc;

use crate::config::{Configuration, NamedPrompt};
use crate::context::{Context, ImageHandle};
use crate::enrichment::{
    CATEGORY_DETECTION_PROMPT, EXTRACT_PRODUCT_DETAILS_PROMPT, FLASH_GENERATOR,
    TRANSLATE_PRODUCT_DETAILS_PROMPT,
};
use crate::events::EventSink;
use crate::providers::Generator;

/// Prompts mirroring the shape of the production catalog.
#[must_use]
pub fn sample_prompts() -> Vec<NamedPrompt> {
    vec![
        NamedPrompt::new(
            CATEGORY_DETECTION_PROMPT,
            "Detect the category of the product in the image using ${category_model}",
        ),
        NamedPrompt::new(
            EXTRACT_PRODUCT_DETAILS_PROMPT,
            "Extract product details from ${category_attributes} as ${product_attribute_value_model}",
        ),
        NamedPrompt::new(
            TRANSLATE_PRODUCT_DETAILS_PROMPT,
            "Translate ${product_json} to ${target_language}",
        ),
    ]
}

/// Builds a configuration with the sample prompts and `generator`
/// registered as the flash model.
#[must_use]
pub fn test_configuration(generator: Arc<dyn Generator>) -> Arc<Configuration> {
    let mut builder = Configuration::builder().with_generator(FLASH_GENERATOR, generator);
    for prompt in sample_prompts() {
        builder = builder.with_prompt(prompt);
    }
    Arc::new(builder.build())
}

/// Creates a context over an empty configuration.
#[must_use]
pub fn empty_context() -> Context {
    Context::new(Arc::new(Configuration::default()))
}

/// Creates a context over `configuration` reporting to `sink`.
#[must_use]
pub fn observed_context(configuration: Arc<Configuration>, sink: Arc<dyn EventSink>) -> Context {
    Context::new(configuration).with_event_sink(sink)
}

/// A tiny JPEG-tagged payload.
#[must_use]
pub fn sample_image() -> ImageHandle {
    ImageHandle::new("image/jpeg", vec![0xff_u8, 0xd8, 0xff, 0xe0])
}
