/**
 * Compiler Tests
 *
 * Whole templates compiled and rendered: static markup, directive
 * combinations, dialect selection and compile-time errors.
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pagetemplate_compiler::ml_parser::Parser;
    use pagetemplate_compiler::runtime::params_from_json;
    use pagetemplate_compiler::tales::TranslatorRegistry;
    use pagetemplate_compiler::translation::compile;
    use pagetemplate_compiler::{
        compile_listing, render_template, CompilerError, Environment, PageTemplate, ProgramKind,
        TemplateError,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(body: &str, params: serde_json::Value) -> String {
        PageTemplate::new(body, Arc::new(Environment::default()))
            .and_then(|template| template.render(params_from_json(params)))
            .unwrap_or_else(|err| panic!("failed to render `{}`: {}", body, err))
    }

    fn compile_error(body: &str) -> CompilerError {
        let err = PageTemplate::new(body, Arc::new(Environment::default()))
            .and_then(|template| template.render(params_from_json(json!({}))))
            .unwrap_err();
        match err {
            TemplateError::Compile(err) => err,
            other => panic!("expected a compile error, got {:?}", other),
        }
    }

    #[test]
    fn should_round_trip_static_markup() {
        let body = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body class="main"><p>a &amp; b</p><br /></body></html>"#;
        assert_eq!(render(body, json!({})), body);
    }

    #[test]
    fn should_sort_static_attributes() {
        assert_eq!(
            render(r#"<a title="t" href="h">x</a>"#, json!({})),
            r#"<a href="h" title="t">x</a>"#
        );
    }

    #[test]
    fn should_self_close_only_empty_elements() {
        assert_eq!(
            render(r#"<div><span/><span>t</span><span tal:content="v"/></div>"#, json!({"v": ""})),
            "<div><span /><span>t</span><span></span></div>"
        );
    }

    #[test]
    fn should_write_the_doctype_on_full_renders() {
        let body = "<!DOCTYPE html>\n<html><p>x</p></html>";
        assert_eq!(
            render_template(body, json!({})).unwrap(),
            "<!DOCTYPE html>\n<html><p>x</p></html>"
        );
    }

    #[test]
    fn should_render_nested_repeats_with_content() {
        let body = r#"<div tal:repeat="row table"><span tal:repeat="c row" tal:content="c"/></div>"#;
        assert_eq!(
            render(body, json!({"table": [[1, 2], [3]]})),
            "<div><span>1</span><span>2</span></div><div><span>3</span></div>"
        );
    }

    #[test]
    fn should_apply_directives_in_order() {
        let body = r#"<ul tal:define="many python: len(items) > 1" tal:condition="many"><li tal:repeat="n items" tal:content="n" tal:attributes="id string:item-${n}"/></ul>"#;
        assert_eq!(
            render(body, json!({"items": [1, 2]})),
            r#"<ul><li id="item-1">1</li><li id="item-2">2</li></ul>"#
        );
        assert_eq!(render(body, json!({"items": [1]})), "");
    }

    #[test]
    fn should_render_directive_elements_without_tags() {
        let body = r#"<div><tal:block repeat="x items"><b tal:content="x"/>,</tal:block></div>"#;
        assert_eq!(
            render(body, json!({"items": ["a", "b"]})),
            "<div><b>a</b>,<b>b</b>,</div>"
        );
    }

    #[test]
    fn should_switch_dialects_per_element() {
        let body = r#"<div tal:default-expression="python"><p tal:content="1 + 2"/></div>"#;
        assert_eq!(render(body, json!({})), "<div><p>3</p></div>");
    }

    #[test]
    fn should_render_plain_text_templates_unescaped() {
        let template = PageTemplate::from_text("Dear ${name} & co", Arc::new(Environment::default()));
        assert_eq!(
            template.render(params_from_json(json!({"name": "<Ada>"}))).unwrap(),
            "Dear <Ada> & co"
        );
    }

    #[test]
    fn should_reject_conflicting_directives() {
        let err = compile_error(r#"<p tal:content="a" tal:replace="b"/>"#);
        assert!(matches!(err, CompilerError::ConflictingDirectives { .. }));
    }

    #[test]
    fn should_reject_unknown_tal_attributes() {
        let err = compile_error(r#"<p tal:contents="a"/>"#);
        match err {
            CompilerError::UnknownDirective { attribute, .. } => {
                assert_eq!(attribute, "tal:contents")
            }
            other => panic!("expected an unknown directive, got {:?}", other),
        }
    }

    #[test]
    fn should_reject_invalid_expressions_with_context() {
        let err = compile_error(r#"<div><p tal:content="python: 1 +"/></div>"#);
        let message = err.to_string();
        assert!(message.contains("tal:content"), "{}", message);
        assert!(message.contains("<p>"), "{}", message);
    }

    #[test]
    fn should_reject_definitions_without_expressions() {
        let err = compile_error(r#"<p tal:define="x"/>"#);
        assert!(err.to_string().contains("Missing expression"));
    }

    #[test]
    fn should_reject_repeats_over_several_names() {
        let err = compile_error(r#"<p tal:repeat="(a, b) pairs"/>"#);
        assert!(err.to_string().contains("Cannot unpack"));
    }

    #[test]
    fn should_require_an_include_href() {
        let err = compile_error(r#"<div><xi:include parse="xml"/></div>"#);
        assert!(err.to_string().contains("Missing `href`"));
    }

    #[test]
    fn should_list_programs() {
        let listing = compile_listing(r#"<p tal:content="python: x"/>"#, &["x"]).unwrap();
        assert_eq!(
            listing.trim_end(),
            ["_write('<p>')", "_write(escape(x))", "_write('</p>')"].join("\n")
        );
    }

    #[test]
    fn should_compile_macros_without_the_doctype() {
        let document = Parser::new()
            .parse("<!DOCTYPE html>\n<html><div metal:define-macro=\"m\">m</div></html>")
            .unwrap();
        let registry = TranslatorRegistry::default();
        let program = compile(&document, Some("m"), &[], &registry, "path").unwrap();
        assert_eq!(program.kind, ProgramKind::Macro);
        assert_eq!(program.source().trim_end(), "_write('<div>m</div>')");
    }
}
