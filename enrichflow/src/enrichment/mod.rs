//! Product enrichment from an image.
//!
//! Three commands run in order against one context:
//!
//! | command              | reads                                              | writes                |
//! |----------------------|----------------------------------------------------|-----------------------|
//! | `category-detection` | `product_image`, `category_model`                  | `category_attributes` |
//! | `content-enricher`   | `category_attributes`, `product_attribute_value_model` | `product_json`    |
//! | `language-extractor` | `languages`, `product_json`                        | `language_<lang>`     |
//!
//! Each command is a no-op when its driving input is absent.

mod commands;
#[cfg(test)]
mod enrichment_tests;
pub mod models;

pub use commands::{category_detection, content_enricher, language_extractor};

use crate::commands::{AsyncFnCommand, Chain};
use crate::context::{Context, ImageHandle, Value};
use std::sync::Arc;

/// Name of the enrichment chain.
pub const PRODUCT_ENRICHMENT_CHAIN: &str = "product-enrichment-from-image";

/// Generator used by every enrichment command.
pub const FLASH_GENERATOR: &str = "flash";

/// Prompt asking the model to classify the product image.
pub const CATEGORY_DETECTION_PROMPT: &str = "category_detection";
/// Prompt asking the model to fill in the product model.
pub const EXTRACT_PRODUCT_DETAILS_PROMPT: &str = "extract_product_details";
/// Prompt asking the model to translate the product.
pub const TRANSLATE_PRODUCT_DETAILS_PROMPT: &str = "translate_product_details";

/// Command name of [`category_detection`].
pub const CATEGORY_DETECTION: &str = "category-detection";
/// Command name of [`content_enricher`].
pub const CONTENT_ENRICHER: &str = "content-enricher";
/// Command name of [`language_extractor`].
pub const LANGUAGE_EXTRACTOR: &str = "language-extractor";

/// Key holding the product image; the chain does nothing without it.
pub const PRODUCT_IMAGE: &str = "product_image";
/// Key holding the example category JSON used as a schema.
pub const CATEGORY_MODEL: &str = "category_model";
/// Key holding the example product JSON used as a schema.
pub const PRODUCT_ATTRIBUTE_VALUE_MODEL: &str = "product_attribute_value_model";
/// Key holding the detected category, written by [`category_detection`].
pub const CATEGORY_ATTRIBUTES: &str = "category_attributes";
/// Key holding the extracted product, written by [`content_enricher`].
pub const PRODUCT_JSON: &str = "product_json";
/// Key holding the list of languages to translate into.
pub const LANGUAGES: &str = "languages";
/// Key holding the language currently being translated.
pub const TARGET_LANGUAGE: &str = "target_language";

/// Key holding the translation for `language`.
#[must_use]
pub fn language_key(language: &str) -> String {
    format!("language_{language}")
}

/// Builds the `product-enrichment-from-image` chain.
#[must_use]
pub fn product_enrichment_from_image() -> Chain {
    Chain::new(
        PRODUCT_ENRICHMENT_CHAIN,
        vec![
            Arc::new(AsyncFnCommand::new(CATEGORY_DETECTION, category_detection)),
            Arc::new(AsyncFnCommand::new(CONTENT_ENRICHER, content_enricher)),
            Arc::new(AsyncFnCommand::new(LANGUAGE_EXTRACTOR, language_extractor)),
        ],
    )
}

/// Seeds a context with an image, the example schema models and the
/// languages to translate into.
pub fn seed_context(ctx: &mut Context, image: ImageHandle, languages: &[String]) {
    let category = serde_json::to_string(&models::example_category()).unwrap_or_default();
    let product = serde_json::to_string(&models::example_product()).unwrap_or_default();

    ctx.set(PRODUCT_IMAGE, image);
    ctx.set(CATEGORY_MODEL, category);
    ctx.set(PRODUCT_ATTRIBUTE_VALUE_MODEL, product);
    if !languages.is_empty() {
        ctx.set(
            LANGUAGES,
            Value::List(languages.iter().map(|l| Value::from(l.as_str())).collect()),
        );
    }
}
