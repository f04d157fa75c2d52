/**
 * Macro Tests
 *
 * `metal:use-macro` calls with slot fills, the variables a macro sees and
 * the ways a macro can be reached.
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pagetemplate_compiler::runtime::params_from_json;
    use pagetemplate_compiler::{CompilerError, Environment, PageTemplate, TemplateError, Value};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const LAYOUT: &str = r#"<html>
  <table metal:define-macro="grid"><tr metal:define-slot="columns"/></table>
  <h1 metal:define-macro="head" tal:content="title"/>
  <section metal:define-macro="page"><p metal:define-slot="body">default</p><i metal:define-slot="footer">foot</i></section>
</html>"#;

    fn template(body: &str) -> PageTemplate {
        PageTemplate::new(body, Arc::new(Environment::default()))
            .unwrap_or_else(|err| panic!("failed to compile `{}`: {}", body, err))
    }

    fn render_with_layout(body: &str, layout: Value, params: serde_json::Value) -> Result<String, TemplateError> {
        let mut params = params_from_json(params);
        params.insert("layout".to_string(), layout);
        template(body).render(params)
    }

    fn render(body: &str, params: serde_json::Value) -> String {
        render_with_layout(body, template(LAYOUT).macros(), params)
            .unwrap_or_else(|err| panic!("failed to render `{}`: {}", body, err))
    }

    #[test]
    fn should_fill_slots_with_caller_variables() {
        let body = r#"<div tal:repeat="row rows"><table metal:use-macro="layout/grid"><tr metal:fill-slot="columns"><td tal:repeat="c row" tal:content="c"/></tr></table></div>"#;
        assert_eq!(
            render(body, json!({"rows": [[1, 2], [3]]})),
            "<div><table><tr><td>1</td><td>2</td></tr></table></div><div><table><tr><td>3</td></tr></table></div>"
        );
    }

    #[test]
    fn should_render_default_slot_content() {
        assert_eq!(
            render(r#"<div metal:use-macro="layout/grid"/>"#, json!({})),
            "<table><tr /></table>"
        );
        assert_eq!(
            render(
                r#"<div metal:use-macro="layout/page"><b metal:fill-slot="footer">mine</b></div>"#,
                json!({})
            ),
            "<section><p>default</p><b>mine</b></section>"
        );
    }

    #[test]
    fn should_pass_visible_definitions_to_macros() {
        let body = r#"<div tal:define="title string:Hi"><h1 metal:use-macro="layout/head"/></div>"#;
        assert_eq!(render(body, json!({})), "<div><h1>Hi</h1></div>");
    }

    #[test]
    fn should_pass_definitions_made_on_the_using_element() {
        let body = r#"<div metal:use-macro="layout/head" tal:define="title string:Own"/>"#;
        assert_eq!(render(body, json!({})), "<h1>Own</h1>");
    }

    #[test]
    fn should_pass_render_parameters_to_macros() {
        assert_eq!(
            render(r#"<div metal:use-macro="layout/head"/>"#, json!({"title": "Param"})),
            "<h1>Param</h1>"
        );
    }

    #[test]
    fn should_reach_macros_through_a_template_object() {
        let layout = Value::object(template(LAYOUT));
        let output = render_with_layout(
            r#"<div metal:use-macro="layout/macros/head"/>"#,
            layout,
            json!({"title": "T"}),
        )
        .unwrap();
        assert_eq!(output, "<h1>T</h1>");
    }

    #[test]
    fn should_use_macros_of_the_same_template() {
        let body = r#"<html><p metal:define-macro="note">note</p><div metal:use-macro="layout/note"/></html>"#;
        let page = template(body);
        let mut params = params_from_json(json!({}));
        params.insert("layout".to_string(), page.macros());
        assert_eq!(page.render(params).unwrap(), "<html><p>note</p><p>note</p></html>");
    }

    #[test]
    fn should_list_macro_names() {
        let layout = template(LAYOUT);
        assert_eq!(layout.macro_names(), vec!["grid", "head", "page"]);
        assert!(layout.has_macro("page"));
        assert!(!layout.has_macro("missing"));
    }

    #[test]
    fn should_render_a_single_macro() {
        let layout = template(LAYOUT);
        assert_eq!(
            layout
                .render_macro("head", params_from_json(json!({"title": "x"})))
                .unwrap(),
            "<h1>x</h1>"
        );
    }

    #[test]
    fn should_report_missing_macros() {
        let err = template(LAYOUT)
            .render_macro("missing", params_from_json(json!({})))
            .unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Compile(CompilerError::MacroNotFound(ref name)) if name == "missing"
        ));

        let err = render_with_layout(
            r#"<div metal:use-macro="layout/missing"/>"#,
            template(LAYOUT).macros(),
            json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn should_not_fall_back_past_macro_compile_errors() {
        let broken = template(r#"<html><p metal:define-macro="m" tal:bogus="x">m</p></html>"#);
        let err = render_with_layout(
            r#"<div tal:content="structure python:layout['m']() | string:fallback"/>"#,
            broken.macros(),
            json!({}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown directive"));
    }

    #[test]
    fn should_fall_back_past_macro_render_errors() {
        let failing = template(r#"<html><p metal:define-macro="m" tal:content="missing/name">m</p></html>"#);
        let output = render_with_layout(
            r#"<div tal:content="structure python:layout['m']() | string:fallback"/>"#,
            failing.macros(),
            json!({}),
        )
        .unwrap();
        assert_eq!(output, "<div>fallback</div>");
    }
}
