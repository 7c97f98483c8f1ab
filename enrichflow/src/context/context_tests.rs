//! Behavioural tests for the context state bag.

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::context::{Context, ImageHandle, Value};
    use crate::errors::ContextError;
    use std::sync::Arc;

    fn test_context() -> Context {
        Context::new(Arc::new(Configuration::default()))
    }

    #[test]
    fn test_has_before_set() {
        let ctx = test_context();
        assert!(!ctx.has("name"));
    }

    #[test]
    fn test_has_after_set() {
        let mut ctx = test_context();
        ctx.set("name", "World");
        assert!(ctx.has("name"));
    }

    #[test]
    fn test_has_after_set_null() {
        let mut ctx = test_context();
        ctx.set("name", "World");
        ctx.set("name", Value::Null);

        assert!(!ctx.has("name"));
        // The key is still stored, it just reads as absent.
        assert_eq!(ctx.get("name"), Some(&Value::Null));
    }

    #[test]
    fn test_has_after_remove() {
        let mut ctx = test_context();
        ctx.set("name", "World");
        assert_eq!(ctx.remove("name"), Some(Value::from("World")));
        assert!(!ctx.has("name"));
    }

    #[test]
    fn test_expand_against_context() {
        let mut ctx = test_context();
        assert_eq!(ctx.expand("Hello ${name}"), "Hello ");

        ctx.set("name", "World");
        assert_eq!(ctx.expand("Hello ${name}"), "Hello World");
    }

    #[test]
    fn test_expand_is_not_recursive() {
        let ctx = test_context().with_value("a", "${b}").with_value("b", "x");
        assert_eq!(ctx.expand("${a}"), "${b}");
    }

    #[test]
    fn test_soft_errors_accumulate_in_order() {
        let mut ctx = test_context();
        assert!(!ctx.has_errors());

        ctx.add_error(ContextError::new("a", "first"));
        ctx.add_error(ContextError::new("b", "second"));

        assert!(ctx.has_errors());
        let messages: Vec<&str> = ctx.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_typed_getters() {
        let image = ImageHandle::new("image/jpeg", vec![0_u8; 4]);
        let ctx = test_context()
            .with_value("product_image", image.clone())
            .with_value("languages", vec!["en", "de"])
            .with_value("title", "Dress Shirt");

        assert_eq!(ctx.get_image("product_image"), Some(&image));
        assert_eq!(ctx.get_list("languages").map(<[Value]>::len), Some(2));
        assert_eq!(ctx.get_text("title"), Some("Dress Shirt"));
        assert!(ctx.get_text("product_image").is_none());
    }

    #[test]
    fn test_contexts_share_configuration() {
        let config = Arc::new(Configuration::default());
        let a = Context::new(config.clone());
        let b = Context::new(config.clone());

        assert!(Arc::ptr_eq(a.configuration(), b.configuration()));
        assert_ne!(a.run_id(), b.run_id());
    }
}
