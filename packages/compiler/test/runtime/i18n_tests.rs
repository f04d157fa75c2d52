/**
 * I18n Tests
 *
 * Message translation through a catalog, and the fallback to the
 * template's own content on a catalog miss.
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pagetemplate_compiler::runtime::params_from_json;
    use pagetemplate_compiler::{
        CompilerConfig, ConfigFlags, Environment, MessageCatalog, PageTemplate,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const GREETING: &str =
        r#"<p i18n:translate="">Hello <b i18n:name="who" tal:content="name">x</b>!</p>"#;

    fn catalog() -> MessageCatalog {
        MessageCatalog::from_json(
            r#"{
                "default_language": "de",
                "domains": {
                    "default": {
                        "de": {
                            "Hello ${who}!": "Hallo ${who}!",
                            "greeting": "Guten Tag",
                            "Picture": "Bild",
                            "Yes": "Ja"
                        }
                    },
                    "shop": {"de": {"Hi": "Servus"}}
                }
            }"#,
        )
        .unwrap()
    }

    fn render_in(env: Environment, body: &str, params: serde_json::Value) -> String {
        PageTemplate::new(body, Arc::new(env))
            .and_then(|template| template.render(params_from_json(params)))
            .unwrap_or_else(|err| panic!("failed to render `{}`: {}", body, err))
    }

    fn render(body: &str, params: serde_json::Value) -> String {
        let env = Environment::default().with_translation_service(Arc::new(catalog()));
        render_in(env, body, params)
    }

    #[test]
    fn should_fall_back_to_content_without_a_catalog() {
        assert_eq!(
            render_in(Environment::default(), GREETING, json!({"name": "Ada"})),
            "<p>Hello <b>Ada</b>!</p>"
        );
    }

    #[test]
    fn should_translate_with_named_children() {
        assert_eq!(
            render(GREETING, json!({"name": "Ada"})),
            "<p>Hallo <b>Ada</b>!</p>"
        );
    }

    #[test]
    fn should_fall_back_on_a_catalog_miss() {
        assert_eq!(
            render(GREETING, json!({"name": "Ada", "target_language": "fr"})),
            "<p>Hello <b>Ada</b>!</p>"
        );
    }

    #[test]
    fn should_translate_explicit_message_ids() {
        let body = r#"<p i18n:translate="greeting">Hello</p>"#;
        assert_eq!(render(body, json!({})), "<p>Guten Tag</p>");
        assert_eq!(
            render_in(Environment::default(), body, json!({})),
            "<p>Hello</p>"
        );
    }

    #[test]
    fn should_translate_dynamic_content() {
        let body = r#"<p tal:content="answer" i18n:translate=""/>"#;
        assert_eq!(render(body, json!({"answer": "Yes"})), "<p>Ja</p>");
        assert_eq!(render(body, json!({"answer": "No"})), "<p>No</p>");
    }

    #[test]
    fn should_translate_attributes() {
        let body = r#"<img alt="Picture" i18n:attributes="alt"/>"#;
        assert_eq!(render(body, json!({})), r#"<img alt="Bild" />"#);
        assert_eq!(
            render_in(Environment::default(), body, json!({})),
            r#"<img alt="Picture" />"#
        );
    }

    #[test]
    fn should_translate_attributes_with_explicit_message_ids() {
        let body = r#"<img alt="Photo" i18n:attributes="alt greeting"/>"#;
        assert_eq!(render(body, json!({})), r#"<img alt="Guten Tag" />"#);
        assert_eq!(
            render_in(Environment::default(), body, json!({})),
            r#"<img alt="Photo" />"#
        );
    }

    #[test]
    fn should_look_up_messages_in_the_current_domain() {
        let body = r#"<div i18n:domain="shop"><p i18n:translate="">Hi</p></div>"#;
        assert_eq!(render(body, json!({})), "<div><p>Servus</p></div>");
    }

    #[test]
    fn should_ignore_the_catalog_when_disabled() {
        let env = Environment::new(CompilerConfig::default().with_flags(ConfigFlags::DISABLE_I18N))
            .with_translation_service(Arc::new(catalog()));
        assert_eq!(
            render_in(env, GREETING, json!({"name": "Ada"})),
            "<p>Hello <b>Ada</b>!</p>"
        );
    }

    #[test]
    fn should_reject_message_ids_on_dynamic_content() {
        let err = PageTemplate::new(
            r#"<p tal:content="x" i18n:translate="msg"/>"#,
            Arc::new(Environment::default()),
        )
        .and_then(|template| template.render(params_from_json(json!({"x": 1}))))
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Can't use message id with dynamic content translation"));
    }
}
