//! Enrichment command bodies.

use super::models::Product;
use super::{
    language_key, CATEGORY_ATTRIBUTES, CATEGORY_DETECTION, CATEGORY_DETECTION_PROMPT,
    CATEGORY_MODEL, CONTENT_ENRICHER, EXTRACT_PRODUCT_DETAILS_PROMPT, FLASH_GENERATOR, LANGUAGES,
    LANGUAGE_EXTRACTOR, PRODUCT_ATTRIBUTE_VALUE_MODEL, PRODUCT_IMAGE, PRODUCT_JSON,
    TARGET_LANGUAGE, TRANSLATE_PRODUCT_DETAILS_PROMPT,
};
use crate::context::{placeholders, Context, Value};
use crate::errors::{CommandError, ContextError};
use crate::utils::fix_output;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

/// Expands a prompt, warning about placeholders the context cannot fill.
fn render_prompt(ctx: &Context, command: &str, template: &str) -> String {
    let unset: Vec<String> = placeholders(template)
        .into_iter()
        .filter(|key| !ctx.has(key))
        .collect();
    if !unset.is_empty() {
        warn!(command, ?unset, "Prompt references unset keys");
    }
    ctx.expand(template)
}

/// Detects the product category from `product_image`.
///
/// Classifying an image needs the category schema in `category_model`.
pub fn category_detection(ctx: &mut Context) -> BoxFuture<'_, Result<(), CommandError>> {
    Box::pin(async move {
        if !ctx.has(PRODUCT_IMAGE) {
            debug!(key = PRODUCT_IMAGE, "No product image, skipping");
            return Ok(());
        }
        let image = ctx
            .get_image(PRODUCT_IMAGE)
            .cloned()
            .ok_or_else(|| CommandError::InvalidValue {
                key: PRODUCT_IMAGE.to_string(),
                expected: "binary",
                found: ctx.get(PRODUCT_IMAGE).map_or("null", Value::kind),
            })?;
        ctx.require_text(CATEGORY_DETECTION, CATEGORY_MODEL)?;

        let config = ctx.configuration().clone();
        let generator = config.generator(FLASH_GENERATOR)?;
        let prompt = render_prompt(
            ctx,
            CATEGORY_DETECTION,
            &config.prompt(CATEGORY_DETECTION_PROMPT)?.prompt,
        );

        let output = generator.understand_image(&prompt, &image).await?;
        info!(command = CATEGORY_DETECTION, bytes = image.len(), "Detected category");
        ctx.set(CATEGORY_ATTRIBUTES, fix_output(&output));
        Ok(())
    })
}

/// Extracts product details for the detected category.
///
/// Needs the product schema in `product_attribute_value_model`. Output that
/// does not match the product model is still stored, and recorded as an
/// error on the context.
pub fn content_enricher(ctx: &mut Context) -> BoxFuture<'_, Result<(), CommandError>> {
    Box::pin(async move {
        if !ctx.has(CATEGORY_ATTRIBUTES) {
            debug!(key = CATEGORY_ATTRIBUTES, "No category attributes, skipping");
            return Ok(());
        }
        ctx.require_text(CONTENT_ENRICHER, PRODUCT_ATTRIBUTE_VALUE_MODEL)?;

        let config = ctx.configuration().clone();
        let generator = config.generator(FLASH_GENERATOR)?;
        let prompt = render_prompt(
            ctx,
            CONTENT_ENRICHER,
            &config.prompt(EXTRACT_PRODUCT_DETAILS_PROMPT)?.prompt,
        );

        let output = fix_output(&generator.generate_content(&prompt).await?);
        info!(command = CONTENT_ENRICHER, "Extracted product details");
        if let Err(err) = Product::from_model_output(&output) {
            let invalid = CommandError::invalid_output(CONTENT_ENRICHER, err.to_string());
            warn!(error = %invalid, "Product details do not match the product model");
            ctx.add_error(ContextError::from_error(CONTENT_ENRICHER, &invalid));
        }
        ctx.set(PRODUCT_JSON, output);
        Ok(())
    })
}

/// Translates the product into every entry of `languages`.
///
/// A failed translation is recorded on the context and the remaining
/// languages are still attempted.
pub fn language_extractor(ctx: &mut Context) -> BoxFuture<'_, Result<(), CommandError>> {
    Box::pin(async move {
        let Some(languages) = ctx.get_list(LANGUAGES).map(<[Value]>::to_vec) else {
            debug!(key = LANGUAGES, "No languages, skipping");
            return Ok(());
        };

        let config = ctx.configuration().clone();
        let generator = config.generator(FLASH_GENERATOR)?;
        let template = &config.prompt(TRANSLATE_PRODUCT_DETAILS_PROMPT)?.prompt;

        for entry in languages {
            let Some(language) = entry.as_text() else {
                ctx.add_error(ContextError::new(
                    LANGUAGE_EXTRACTOR,
                    format!("language entries must be text, found {}", entry.kind()),
                ));
                continue;
            };

            ctx.set(TARGET_LANGUAGE, language);
            let prompt = render_prompt(ctx, LANGUAGE_EXTRACTOR, template);
            match generator.generate_content(&prompt).await {
                Ok(output) => {
                    debug!(command = LANGUAGE_EXTRACTOR, language, "Translated product");
                    ctx.set(language_key(language), fix_output(&output));
                }
                Err(err) => {
                    warn!(command = LANGUAGE_EXTRACTOR, language, error = %err, "Translation failed");
                    ctx.add_error(ContextError::new(
                        LANGUAGE_EXTRACTOR,
                        format!("{language}: {err}"),
                    ));
                }
            }
        }
        Ok(())
    })
}
