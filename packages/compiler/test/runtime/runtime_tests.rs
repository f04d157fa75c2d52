/**
 * Runtime Tests
 *
 * Rendering behavior of compiled programs: escaping, scoping, loops,
 * fallbacks and attribute handling.
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pagetemplate_compiler::runtime::params_from_json;
    use pagetemplate_compiler::{
        CompilerConfig, ConfigFlags, Environment, PageTemplate, Params, TemplateError, Value,
    };
    use pretty_assertions::assert_eq;
    use rayon::prelude::*;
    use serde_json::json;

    fn template(body: &str) -> PageTemplate {
        PageTemplate::new(body, Arc::new(Environment::default()))
            .unwrap_or_else(|err| panic!("failed to compile `{}`: {}", body, err))
    }

    fn render(body: &str, params: serde_json::Value) -> String {
        template(body)
            .render(params_from_json(params))
            .unwrap_or_else(|err| panic!("failed to render `{}`: {}", body, err))
    }

    #[test]
    fn should_escape_text_and_attributes() {
        let output = render(
            r#"<p tal:content="v" title="${v}"/>"#,
            json!({"v": "<b>&\"quote\"</b>"}),
        );
        assert_eq!(
            output,
            r#"<p title="&lt;b&gt;&amp;&quot;quote&quot;&lt;/b&gt;">&lt;b&gt;&amp;"quote"&lt;/b&gt;</p>"#
        );
    }

    #[test]
    fn should_write_structure_verbatim() {
        assert_eq!(
            render(
                r#"<div tal:content="structure html"/>"#,
                json!({"html": "<em>hi</em>"})
            ),
            "<div><em>hi</em></div>"
        );
    }

    #[test]
    fn should_escape_interpolated_text() {
        assert_eq!(
            render("<p>a ${v} &amp; b</p>", json!({"v": "<x>"})),
            "<p>a &lt;x&gt; &amp; b</p>"
        );
    }

    #[test]
    fn should_honor_disabled_interpolation() {
        assert_eq!(
            render(
                r#"<p meta:interpolation="false">${v}</p>"#,
                json!({"v": "x"})
            ),
            "<p>${v}</p>"
        );
    }

    #[test]
    fn should_restore_shadowed_definitions() {
        let body = r#"<div tal:define="x string:outer"><p tal:define="x string:inner" tal:content="x"/><span tal:content="x"/></div>"#;
        assert_eq!(
            render(body, json!({})),
            "<div><p>inner</p><span>outer</span></div>"
        );
    }

    #[test]
    fn should_restore_names_defined_twice_on_one_element() {
        let body = r#"<div><p tal:define="x string:a; x string:b" tal:content="x"/><i tal:content="x"/></div>"#;
        assert_eq!(
            render(body, json!({"x": "outer"})),
            "<div><p>b</p><i>outer</i></div>"
        );

        let body = r#"<div tal:define="x string:outer"><p tal:define="x string:a; x string:b" tal:content="x"/><i tal:content="x"/></div>"#;
        assert_eq!(
            render(body, json!({})),
            "<div><p>b</p><i>outer</i></div>"
        );
    }

    #[test]
    fn should_keep_global_definitions() {
        let body = r#"<div><p tal:define="global g string:G"/><span tal:content="g"/></div>"#;
        assert_eq!(render(body, json!({})), "<div><p /><span>G</span></div>");
    }

    #[test]
    fn should_unpack_definitions() {
        let body = r#"<p tal:define="(a, b) python: (1, 2)" tal:content="python: a + b"/>"#;
        assert_eq!(render(body, json!({})), "<p>3</p>");
    }

    #[test]
    fn should_skip_false_conditions_but_keep_the_tail() {
        let body = r#"<div><p tal:condition="python: False">x</p>tail</div>"#;
        assert_eq!(render(body, json!({})), "<div>tail</div>");
    }

    #[test]
    fn should_replace_and_omit_tags() {
        let body = r#"<div><b tal:replace="v">x</b><i tal:omit-tag="">y</i><u tal:omit-tag="flag">z</u></div>"#;
        assert_eq!(
            render(body, json!({"v": "V", "flag": true})),
            "<div>Vyz</div>"
        );
        assert_eq!(
            render(body, json!({"v": "V", "flag": false})),
            "<div>Vy<u>z</u></div>"
        );
    }

    #[test]
    fn should_expose_repeat_state() {
        let body = r#"<div tal:repeat="x items"><i tal:condition="python: repeat['x'].index == 2" tal:content="string:${repeat/x/number} ${repeat/x/parity} ${repeat/x/letter} ${repeat/x/roman} ${repeat/x/start} ${repeat/x/end} ${repeat/x/length}"/></div>"#;
        assert_eq!(
            render(body, json!({"items": ["a", "b", "c", "d", "e"]})),
            "<div></div><div></div><div><i>3 even c iii False False 5</i></div><div></div><div></div>"
        );
    }

    #[test]
    fn should_drop_repeat_state_after_the_loop() {
        let body = r#"<div><i tal:repeat="x items" tal:content="x"/><b tal:condition="not:exists:repeat/x">done</b></div>"#;
        assert_eq!(
            render(body, json!({"items": [1, 2]})),
            "<div><i>1</i><i>2</i><b>done</b></div>"
        );
    }

    #[test]
    fn should_render_nested_repeats() {
        let body = r#"<div tal:repeat="row table"><span tal:repeat="c row" tal:content="c"/></div>"#;
        assert_eq!(
            render(body, json!({"table": [[1, 2], [3]]})),
            "<div><span>1</span><span>2</span></div><div><span>3</span></div>"
        );
    }

    #[test]
    fn should_fall_back_across_dialects() {
        let body = r#"<p tal:content="python: missing + 1 | user/name | string:ok"/>"#;
        assert_eq!(render(body, json!({"user": {}})), "<p>ok</p>");
        assert_eq!(render(body, json!({"user": {"name": "Ada"}})), "<p>Ada</p>");
    }

    #[test]
    fn should_drop_none_and_false_attributes() {
        let body = r#"<a href="x" tal:attributes="href nothing; title t; hidden python: False"/>"#;
        assert_eq!(render(body, json!({"t": "T"})), r#"<a title="T" />"#);
    }

    #[test]
    fn should_merge_attribute_maps() {
        let body = r#"<a href="x" py:attrs="{'class': 'c', 'href': None}"/>"#;
        assert_eq!(render(body, json!({})), r#"<a class="c" />"#);
    }

    #[test]
    fn should_render_genshi_loops_and_assignments() {
        let body = r#"<ul py:with="suffix = '!'"><li py:for="i in items" py:content="str(i) + suffix"/></ul>"#;
        assert_eq!(
            render(body, json!({"items": [1, 2]})),
            "<ul><li>1!</li><li>2!</li></ul>"
        );
    }

    #[test]
    fn should_call_hoisted_definitions() {
        let body = r#"<div><p py:def="greet(name)">Hello ${name}</p><span tal:content="python: greet('Ada')"/></div>"#;
        assert_eq!(
            render(body, json!({})),
            "<div><span><p>Hello Ada</p></span></div>"
        );
    }

    #[test]
    fn should_render_the_first_matching_choice() {
        let body = r#"<div py:choose="n"><b py:when="1">one</b><i py:when="2">two</i><u py:otherwise="">many</u></div>"#;
        assert_eq!(render(body, json!({"n": 2})), "<div><i>two</i></div>");
        assert_eq!(render(body, json!({"n": 5})), "<div><u>many</u></div>");

        let body = r#"<div py:choose=""><b py:when="n &gt; 0">pos</b><i py:when="n &gt; 1">big</i><u py:otherwise="">none</u></div>"#;
        assert_eq!(render(body, json!({"n": 3})), "<div><b>pos</b></div>");
        assert_eq!(render(body, json!({"n": 0})), "<div><u>none</u></div>");
    }

    #[test]
    fn should_scope_nested_choices() {
        let body = r#"<div py:choose="a"><p py:when="1"><i py:choose="b"><b py:when="1">x</b><b py:otherwise="">y</b></i></p><p py:otherwise="">z</p></div>"#;
        assert_eq!(
            render(body, json!({"a": 1, "b": 2})),
            "<div><p><i><b>y</b></i></p></div>"
        );
        assert_eq!(render(body, json!({"a": 2, "b": 1})), "<div><p>z</p></div>");
    }

    #[test]
    fn should_reject_when_outside_choose() {
        let env = Arc::new(Environment::default());
        assert!(PageTemplate::new(r#"<p py:when="1">x</p>"#, Arc::clone(&env)).is_err());
        assert!(PageTemplate::new(r#"<p py:otherwise="">x</p>"#, env).is_err());
    }

    #[test]
    fn should_replace_matched_elements() {
        let body = r#"<html><div py:match="p" class="m">${select('text()')}</div><p>hi</p><p>there</p></html>"#;
        assert_eq!(
            render(body, json!({})),
            r#"<html><div class="m">hi</div><div class="m">there</div></html>"#
        );
    }

    #[test]
    fn should_expose_matched_attributes_and_content() {
        let body = r#"<html><a py:match="//ref[@to]" href="${select('@to')}">${select('*|text()')}</a><body><ref to="/x">go <b>now</b></ref><ref>stay</ref></body></html>"#;
        assert_eq!(
            render(body, json!({})),
            r#"<html><body><a href="/x">go <b>now</b></a><ref>stay</ref></body></html>"#
        );
    }

    #[test]
    fn should_reject_content_on_matched_elements() {
        let env = Arc::new(Environment::default());
        let body = r#"<html><b py:match="p">x</b><p tal:content="v"/></html>"#;
        assert!(PageTemplate::new(body, env).is_err());
    }

    #[test]
    fn should_strip_genshi_tags() {
        let body = r#"<div><b py:strip="">x</b><i py:if="show">y</i></div>"#;
        assert_eq!(render(body, json!({"show": false})), "<div>x</div>");
    }

    #[test]
    fn should_render_named_entities_as_characters() {
        assert_eq!(
            render("<p>a&nbsp;b &amp; c</p>", json!({})),
            "<p>a\u{a0}b &amp; c</p>"
        );
    }

    #[test]
    fn should_write_comments_and_cdata_verbatim() {
        let body = "<div><!-- ${x} --><![CDATA[a < b]]></div>";
        assert_eq!(render(body, json!({})), body);
    }

    #[test]
    fn should_annotate_errors_in_debug_mode() {
        let env = Environment::new(CompilerConfig::default().with_flags(ConfigFlags::DEBUG));
        let err = PageTemplate::new(r#"<p tal:content="user/missing"/>"#, Arc::new(env))
            .unwrap()
            .render(params_from_json(json!({"user": {}})))
            .unwrap_err();
        match err {
            TemplateError::Render(render) => {
                assert!(render.is_annotated());
                assert!(render.to_string().contains("user/missing"));
            }
            other => panic!("expected a render error, got {:?}", other),
        }
    }

    #[test]
    fn should_render_concurrently() {
        let template = template(r#"<p tal:content="n"/>"#);
        let outputs: Vec<String> = (0..64i64)
            .into_par_iter()
            .map(|n| {
                let mut params = Params::new();
                params.insert("n".to_string(), Value::Int(n));
                template.render(params).unwrap()
            })
            .collect();
        for (n, output) in outputs.iter().enumerate() {
            assert_eq!(output, &format!("<p>{}</p>", n));
        }
    }
}
