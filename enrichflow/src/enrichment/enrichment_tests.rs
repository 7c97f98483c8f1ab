//! Tests for the product enrichment chain.

#[cfg(test)]
mod tests {
    use crate::enrichment::models::{example_category, example_product, Product};
    use crate::enrichment::*;
    use crate::commands::Command;
    use crate::context::Context;
    use crate::errors::{CommandError, ConfigError, GenerationError};
    use crate::events::{event_types, CollectingEventSink};
    use crate::providers::MockGenerator as AutoMockGenerator;
    use crate::testing::{
        assert_event_sequence, assert_no_errors, observed_context, sample_image, sample_prompts,
        test_configuration, MockGenerator,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn product_json() -> String {
        serde_json::to_string(&example_product()).unwrap()
    }

    fn scripted_generator() -> Arc<MockGenerator> {
        Arc::new(
            MockGenerator::with_response("unexpected prompt")
                .on("Detect the category", "```json\n{\"category\": \"Dress Shirts\"}\n```")
                .on("Extract product details", product_json())
                .on("FR_FR", "{\"language\": \"FR_FR\"}")
                .on("DE_DE", "{\"language\": \"DE_DE\"}"),
        )
    }

    fn seeded_context(generator: Arc<dyn crate::providers::Generator>, languages: &[&str]) -> Context {
        let mut ctx = Context::new(test_configuration(generator));
        let languages: Vec<String> = languages.iter().map(|l| (*l).to_string()).collect();
        seed_context(&mut ctx, sample_image(), &languages);
        ctx
    }

    #[tokio::test]
    async fn test_full_enrichment() {
        let generator = scripted_generator();
        let mut ctx = seeded_context(generator.clone(), &["FR_FR", "DE_DE"]);

        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        assert_no_errors(&ctx);
        assert_eq!(
            ctx.get_text(CATEGORY_ATTRIBUTES),
            Some("\n{\"category\": \"Dress Shirts\"}\n")
        );
        let product = Product::from_model_output(ctx.get_text(PRODUCT_JSON).unwrap()).unwrap();
        assert_eq!(product, example_product());
        assert_eq!(ctx.get_text(&language_key("FR_FR")), Some("{\"language\": \"FR_FR\"}"));
        assert_eq!(ctx.get_text(&language_key("DE_DE")), Some("{\"language\": \"DE_DE\"}"));
        assert_eq!(ctx.get_text(TARGET_LANGUAGE), Some("DE_DE"));
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test]
    async fn test_prompts_are_expanded_from_context() {
        let generator = scripted_generator();
        let mut ctx = seeded_context(generator.clone(), &["FR_FR"]);

        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        let prompts = generator.prompts();
        let category_json = serde_json::to_string(&example_category()).unwrap();
        assert_eq!(
            prompts[0],
            format!("Detect the category of the product in the image using {category_json}")
        );
        assert!(prompts[1].contains("\"category\": \"Dress Shirts\""));
        assert!(!prompts[1].contains("${"));
        assert_eq!(prompts[2], format!("Translate {} to FR_FR", product_json()));
    }

    #[tokio::test]
    async fn test_missing_image_is_a_no_op() {
        let generator = scripted_generator();
        let mut ctx = Context::new(test_configuration(generator.clone()));

        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        assert!(ctx.is_empty());
        assert!(!ctx.has_errors());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_languages_skips_translation() {
        let generator = scripted_generator();
        let mut ctx = seeded_context(generator.clone(), &[]);

        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        assert!(ctx.has(PRODUCT_JSON));
        assert!(!ctx.has(TARGET_LANGUAGE));
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_aborts_chain() {
        let generator = Arc::new(MockGenerator::failing());
        let sink = Arc::new(CollectingEventSink::new());
        let mut ctx = observed_context(test_configuration(generator.clone()), sink.clone());
        seed_context(&mut ctx, sample_image(), &["FR_FR".to_string()]);

        let err = product_enrichment_from_image()
            .execute(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::Generation(GenerationError::Status { status: 503, .. })
        ));
        assert!(!ctx.has(CATEGORY_ATTRIBUTES));
        assert!(!ctx.has(PRODUCT_JSON));
        assert_eq!(generator.call_count(), 1);
        assert_event_sequence(
            &sink,
            &[
                event_types::CHAIN_STARTED,
                event_types::COMMAND_STARTED,
                event_types::CHAIN_ABORTED,
            ],
        );
        let aborted = sink.events_of_type(event_types::CHAIN_ABORTED);
        let data = aborted[0].1.as_ref().unwrap();
        assert_eq!(data["command"], CATEGORY_DETECTION);
        assert_eq!(data["error_kind"], "generation");
    }

    #[tokio::test]
    async fn test_translation_failure_is_recorded_and_loop_continues() {
        let mut generator = AutoMockGenerator::new();
        generator
            .expect_understand_image()
            .times(1)
            .returning(|_, _| Ok("{\"category\": \"Dress Shirts\"}".to_string()));
        generator
            .expect_generate_content()
            .times(4)
            .returning(|prompt| {
                if prompt.starts_with("Extract product details") {
                    Ok(product_json())
                } else if prompt.contains("DE_DE") {
                    Err(GenerationError::Blocked {
                        reason: "SAFETY".to_string(),
                    })
                } else {
                    Ok(format!("ok: {}", prompt.len()))
                }
            });

        let mut ctx = seeded_context(Arc::new(generator), &["FR_FR", "DE_DE", "IT_IT"]);
        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        assert!(ctx.has(&language_key("FR_FR")));
        assert!(!ctx.has(&language_key("DE_DE")));
        assert!(ctx.has(&language_key("IT_IT")));

        assert_eq!(ctx.errors().len(), 1);
        let error = &ctx.errors()[0];
        assert_eq!(error.command, LANGUAGE_EXTRACTOR);
        assert_eq!(error.message, "DE_DE: Generation blocked: SAFETY");
    }

    #[tokio::test]
    async fn test_invalid_product_output_is_recorded_and_chain_continues() {
        let generator = Arc::new(
            MockGenerator::with_response("unexpected prompt")
                .on("Detect the category", "{\"category\": \"Dress Shirts\"}")
                .on("Extract product details", "The shirt is blue.")
                .on("FR_FR", "{\"language\": \"FR_FR\"}"),
        );
        let mut ctx = seeded_context(generator.clone(), &["FR_FR"]);

        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.get_text(PRODUCT_JSON), Some("The shirt is blue."));
        assert!(ctx.has(&language_key("FR_FR")));
        assert_eq!(ctx.errors().len(), 1);
        let error = &ctx.errors()[0];
        assert_eq!(error.command, CONTENT_ENRICHER);
        assert!(error
            .message
            .starts_with("Invalid output from 'content-enricher': "));
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_category_schema_aborts_chain() {
        let generator = scripted_generator();
        let mut ctx = Context::new(test_configuration(generator.clone()));
        ctx.set(PRODUCT_IMAGE, sample_image());

        let err = product_enrichment_from_image()
            .execute(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            CommandError::MissingInput { command, key }
                if command == CATEGORY_DETECTION && key == CATEGORY_MODEL
        ));
        assert_eq!(err.kind(), "missing_input");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_product_schema_aborts_enricher() {
        let generator = scripted_generator();
        let mut ctx = seeded_context(generator.clone(), &["FR_FR"]);
        ctx.remove(PRODUCT_ATTRIBUTE_VALUE_MODEL);

        let err = product_enrichment_from_image()
            .execute(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::MissingInput { command, .. } if command == CONTENT_ENRICHER
        ));
        assert!(ctx.has(CATEGORY_ATTRIBUTES));
        assert!(!ctx.has(PRODUCT_JSON));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_text_language_is_recorded() {
        let generator = scripted_generator();
        let mut ctx = seeded_context(generator, &["FR_FR"]);
        ctx.set(
            LANGUAGES,
            Value::List(vec![Value::from(42.0), Value::from("FR_FR")]),
        );

        product_enrichment_from_image().execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.errors().len(), 1);
        assert!(ctx.errors()[0].message.contains("number"));
        assert!(ctx.has(&language_key("FR_FR")));
    }

    #[tokio::test]
    async fn test_unknown_generator_is_fatal() {
        let config = Arc::new(
            sample_prompts()
                .into_iter()
                .fold(crate::config::Configuration::builder(), |b, p| b.with_prompt(p))
                .build(),
        );
        let mut ctx = Context::new(config);
        seed_context(&mut ctx, sample_image(), &[]);

        let err = product_enrichment_from_image()
            .execute(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::Config(ConfigError::UnknownGenerator(name)) if name == FLASH_GENERATOR
        ));
    }

    #[tokio::test]
    async fn test_text_image_is_rejected() {
        let generator = scripted_generator();
        let mut ctx = Context::new(test_configuration(generator.clone()));
        ctx.set(PRODUCT_IMAGE, "gs://bucket/shirt.jpeg");

        let err = product_enrichment_from_image()
            .execute(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::InvalidValue { expected: "binary", found: "text", .. }
        ));
        assert_eq!(generator.call_count(), 0);
    }

    #[test]
    fn test_chain_layout() {
        let chain = product_enrichment_from_image();
        let names: Vec<&str> = chain.commands().iter().map(|c| c.name()).collect();

        assert_eq!(chain.name(), PRODUCT_ENRICHMENT_CHAIN);
        assert_eq!(names, vec![CATEGORY_DETECTION, CONTENT_ENRICHER, LANGUAGE_EXTRACTOR]);
    }

    #[test]
    fn test_seed_context() {
        let mut ctx = crate::testing::empty_context();
        seed_context(&mut ctx, sample_image(), &["FR_FR".to_string()]);

        assert!(ctx.get_image(PRODUCT_IMAGE).is_some());
        let category: models::Category =
            serde_json::from_str(ctx.get_text(CATEGORY_MODEL).unwrap()).unwrap();
        assert_eq!(category, example_category());
        assert_eq!(ctx.get_list(LANGUAGES).unwrap().len(), 1);
    }
}
