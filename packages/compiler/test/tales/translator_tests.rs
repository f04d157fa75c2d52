/**
 * Expression Translator Tests
 *
 * Dialect selection, fallback chains and the directive argument syntax,
 * checked both on the translated values and through rendering.
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pagetemplate_compiler::output::{JoinPart, ValueExpr};
    use pagetemplate_compiler::runtime::{params_from_json, ProviderMap};
    use pagetemplate_compiler::tales::definitions::{self, Definition};
    use pagetemplate_compiler::tales::TranslatorRegistry;
    use pagetemplate_compiler::{
        CompilerConfig, Environment, Params, PageTemplate, TemplateError, Value,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render_with(env: Environment, body: &str, params: Params) -> Result<String, TemplateError> {
        PageTemplate::new(body, Arc::new(env))?.render(params)
    }

    fn render(body: &str, params: serde_json::Value) -> String {
        render_with(Environment::default(), body, params_from_json(params))
            .unwrap_or_else(|err| panic!("failed to render `{}`: {}", body, err))
    }

    #[test]
    fn should_translate_paths_into_traversals() {
        let registry = TranslatorRegistry::default();
        let value = registry.compile("user/name", "path").unwrap();
        assert_eq!(value.source(), "user/name");
        assert!(value.as_expr().is_some());
    }

    #[test]
    fn should_translate_every_expression_that_validates() {
        let registry = TranslatorRegistry::default();
        let corpus = [
            "user/name",
            "user/?key",
            "a/b | c | string:x",
            "nothing",
            "string:${a | b}",
            "string:$$x and ${y}",
            "string:a;;b",
            "not: exists: a/b",
            "nocall: macros/m",
            "exists:a | python: 1",
            "provider:sidebar",
            "python: f(1, x, key='v')",
            "python: {'a': 1}['a']",
            "python: (1, 2)[0] | nothing",
            "python: 'a|b' | c",
            "python: a if b else c",
            "python: [x for x in y]",
            "python: not a and -b or c ** 2",
            "python: x[1:2]",
            "python: ",
            "python: (",
            "python: 1 +",
            "a/",
            "/a",
            "string:${",
            "unknown: x",
            "a | | b",
            "|",
        ];
        let mut validated = 0;
        for dialect in ["path", "python", "string"] {
            for source in corpus {
                if registry.validate(source, dialect).is_err() {
                    continue;
                }
                validated += 1;
                if let Err(err) = registry.compile(source, dialect) {
                    panic!("`{}` validated as {} but failed to translate: {}", source, dialect, err);
                }
            }
        }
        assert!(validated >= corpus.len() / 2, "only {} expressions validated", validated);
    }

    #[test]
    fn should_keep_pipes_inside_nested_pragmas() {
        let registry = TranslatorRegistry::default();
        let value = registry.compile("not: python: 'a|b' == x", "path").unwrap();
        assert!(!matches!(value, ValueExpr::Parts(_)), "{:?}", value);
        assert!(registry.validate("string:${", "path").is_err());
        assert!(registry.validate("not: python: (", "path").is_err());
    }

    #[test]
    fn should_split_fallback_alternatives() {
        let registry = TranslatorRegistry::default();
        match registry.compile("a/b | c | string:x", "path").unwrap() {
            ValueExpr::Parts(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected alternatives, got {:?}", other),
        }
    }

    #[test]
    fn should_let_string_consume_the_remainder() {
        let registry = TranslatorRegistry::default();
        let value = registry.compile("string:a | b", "path").unwrap();
        assert_eq!(value.source(), "'a | b'");
    }

    #[test]
    fn should_keep_pipes_inside_native_string_literals() {
        let registry = TranslatorRegistry::default();
        let value = registry.compile("python: 'a|b'", "path").unwrap();
        assert!(value.as_expr().is_some());
    }

    #[test]
    fn should_reject_unknown_pragmas() {
        let registry = TranslatorRegistry::default();
        let err = registry.compile("bogus:x", "path").unwrap_err();
        assert!(err.to_string().contains("Unknown expression type: bogus"));
    }

    #[test]
    fn should_reject_invalid_paths() {
        let registry = TranslatorRegistry::default();
        assert!(registry.validate("a//b", "path").is_err());
        assert!(registry.validate("a/?b/0", "path").is_ok());
    }

    #[test]
    fn should_translate_empty_expressions_to_none() {
        let registry = TranslatorRegistry::default();
        assert_eq!(registry.compile("  ", "path").unwrap(), ValueExpr::none());
    }

    #[test]
    fn should_scan_string_interpolations() {
        let registry = TranslatorRegistry::default();
        match registry.compile("string:Hello ${name}, $who!", "path").unwrap() {
            ValueExpr::Join(parts) => {
                assert_eq!(parts[0], JoinPart::Literal("Hello ".to_string()));
                assert_eq!(
                    parts
                        .iter()
                        .filter(|part| matches!(part, JoinPart::Value(_)))
                        .count(),
                    2
                );
            }
            other => panic!("expected a join, got {:?}", other),
        }
    }

    #[test]
    fn should_render_paths() {
        assert_eq!(
            render(
                r#"<p tal:content="user/name"/>"#,
                json!({"user": {"name": "Ada"}})
            ),
            "<p>Ada</p>"
        );
        assert_eq!(
            render(r#"<p tal:content="items/1"/>"#, json!({"items": ["a", "b"]})),
            "<p>b</p>"
        );
    }

    #[test]
    fn should_render_variable_path_segments() {
        assert_eq!(
            render(
                r#"<p tal:content="user/?key"/>"#,
                json!({"user": {"name": "Ada"}, "key": "name"})
            ),
            "<p>Ada</p>"
        );
    }

    #[test]
    fn should_fall_back_on_evaluation_errors() {
        assert_eq!(
            render(
                r#"<p tal:content="user/missing | string:fallback"/>"#,
                json!({"user": {}})
            ),
            "<p>fallback</p>"
        );
    }

    #[test]
    fn should_propagate_errors_of_the_last_alternative() {
        let err = render_with(
            Environment::default(),
            r#"<p tal:content="missing"/>"#,
            Params::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn should_render_string_expressions() {
        assert_eq!(
            render(
                r#"<p tal:content="string:Hello ${name}, $$5 for $who"/>"#,
                json!({"name": "Ada", "who": "you"})
            ),
            "<p>Hello Ada, $5 for you</p>"
        );
    }

    #[test]
    fn should_render_exists_and_not() {
        let body = r#"<p><i tal:condition="exists:user/name">a</i><b tal:condition="not:user/admin">b</b><u tal:condition="exists:user/age">c</u></p>"#;
        assert_eq!(
            render(body, json!({"user": {"name": "Ada", "admin": false}})),
            "<p><i>a</i><b>b</b></p>"
        );
    }

    #[test]
    fn should_render_native_expressions() {
        assert_eq!(
            render(
                r#"<p tal:content="python: len(items) * 2"/>"#,
                json!({"items": [1, 2, 3]})
            ),
            "<p>6</p>"
        );
    }

    #[test]
    fn should_call_paths_unless_nocall() {
        let mut params = Params::new();
        params.insert(
            "greet".to_string(),
            Value::function("greet", |_, _| Ok(Value::str("hello"))),
        );
        let body = r#"<p tal:define="f nocall:greet" tal:content="python: f() + '!'"/>"#;
        assert_eq!(
            render_with(Environment::default(), body, params.clone()).unwrap(),
            "<p>hello!</p>"
        );
        assert_eq!(
            render_with(Environment::default(), r#"<p tal:content="greet"/>"#, params).unwrap(),
            "<p>hello</p>"
        );
    }

    #[test]
    fn should_render_content_providers_as_markup() {
        let mut providers = ProviderMap::new();
        providers.register("menu", |_: &Params| -> anyhow::Result<String> {
            Ok("<ul></ul>".to_string())
        });
        let env = Environment::default().with_providers(Arc::new(providers));
        assert_eq!(
            render_with(env, r#"<nav tal:content="provider:menu"/>"#, Params::new()).unwrap(),
            "<nav><ul></ul></nav>"
        );
    }

    #[test]
    fn should_report_missing_providers() {
        let err = render_with(
            Environment::default(),
            r#"<nav tal:content="provider:menu"/>"#,
            Params::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
        assert!(err.to_string().contains("content provider not found: menu"));
    }

    #[test]
    fn should_use_the_configured_default_dialect() {
        let env = Environment::new(CompilerConfig::default().with_default_expression("python"));
        assert_eq!(
            render_with(env, r#"<p tal:content="1 + 1"/>"#, Params::new()).unwrap(),
            "<p>2</p>"
        );
    }

    #[test]
    fn should_parse_definitions() {
        let parsed = definitions::definitions(
            "global a string:x;; y; local (b, c) python: (1, 2); d",
            |_| true,
        )
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                Definition {
                    names: vec!["a".to_string()],
                    global: true,
                    expression: Some("string:x; y".to_string()),
                },
                Definition {
                    names: vec!["b".to_string(), "c".to_string()],
                    global: false,
                    expression: Some("python: (1, 2)".to_string()),
                },
                Definition {
                    names: vec!["d".to_string()],
                    global: false,
                    expression: None,
                },
            ]
        );
    }

    #[test]
    fn should_reject_reserved_variable_names() {
        assert!(definitions::variable("repeat").is_err());
        assert!(definitions::variable("_hidden").is_err());
        assert_eq!(definitions::variable(" ok ").unwrap(), "ok");
    }

    #[test]
    fn should_parse_attribute_lists() {
        let parsed = definitions::attributes("href url; data-x string:a;; b", |_| true).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("href".to_string(), "url".to_string()),
                ("data-x".to_string(), "string:a; b".to_string()),
            ]
        );
    }

    #[test]
    fn should_parse_genshi_forms() {
        assert_eq!(
            definitions::signature("row(a, b)").unwrap(),
            ("row".to_string(), vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            definitions::for_loop("(k, v) in items.items()").unwrap(),
            (
                vec!["k".to_string(), "v".to_string()],
                "items.items()".to_string()
            )
        );
        let assigned = definitions::assignments("a = 1; b = a == 1", |_| true).unwrap();
        assert_eq!(assigned[1].expression.as_deref(), Some("a == 1"));
    }

    #[test]
    fn should_parse_i18n_mappings() {
        assert_eq!(
            definitions::mapping("name; count msg_count").unwrap(),
            vec![
                ("name".to_string(), None),
                ("count".to_string(), Some("msg_count".to_string())),
            ]
        );
    }
}
