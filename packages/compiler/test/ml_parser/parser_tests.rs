/**
 * Markup Parser Tests
 *
 * Element tree construction: namespaces, text and tails, entities and
 * verbatim sections.
 */

#[cfg(test)]
mod tests {
    use pagetemplate_compiler::ml_parser::{
        to_markup, Document, Parser, META_NS, TAL_NS, XHTML_NS,
    };
    use pagetemplate_compiler::CompilerError;

    fn parse(body: &str) -> Document {
        Parser::new()
            .parse(body)
            .unwrap_or_else(|err| panic!("failed to parse `{}`: {}", body, err))
    }

    #[test]
    fn should_bind_standard_prefixes() {
        let document = parse(r#"<div tal:content="x">y</div>"#);
        let attribute = &document.root.attributes[0];
        assert_eq!(attribute.name.namespace.as_deref(), Some(TAL_NS));
        assert_eq!(attribute.name.prefix.as_deref(), Some("tal"));
        assert_eq!(attribute.value, "x");
    }

    #[test]
    fn should_keep_text_and_tails_apart() {
        let document = parse("<div>a<b>b</b>c<i/>d</div>");
        let root = &document.root;
        assert_eq!(root.text.as_ref().map(|t| t.value.as_str()), Some("a"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(
            root.children[0].tail.as_ref().map(|t| t.value.as_str()),
            Some("c")
        );
        assert_eq!(
            root.children[1].tail.as_ref().map(|t| t.value.as_str()),
            Some("d")
        );
    }

    #[test]
    fn should_decode_html_entities() {
        let document = parse("<p>a&nbsp;b &amp; c</p>");
        assert_eq!(
            document.root.text.map(|t| t.value),
            Some("a\u{a0}b & c".to_string())
        );
    }

    #[test]
    fn should_keep_the_doctype() {
        let document = parse("<!DOCTYPE html>\n<html/>");
        assert_eq!(document.doctype.as_deref(), Some("<!DOCTYPE html>"));
    }

    #[test]
    fn should_keep_comments_and_cdata_verbatim() {
        let document = parse("<div><!-- note --><![CDATA[a < b]]></div>");
        let children = &document.root.children;
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|child| child.is_literal()));
        assert_eq!(children[0].text.as_ref().unwrap().value, "<!-- note -->");
        assert_eq!(children[1].text.as_ref().unwrap().value, "<![CDATA[a < b]]>");
        assert!(children[1].text.as_ref().unwrap().verbatim);
    }

    #[test]
    fn should_recognize_directive_elements() {
        let document = parse(r#"<div><tal:block content="x"/></div>"#);
        let block = &document.root.children[0];
        assert!(!block.is_markup());
        assert_eq!(block.attribute(None, "content"), Some("x"));
    }

    #[test]
    fn should_accept_xhtml_roots() {
        let document = parse(r#"<html xmlns="http://www.w3.org/1999/xhtml"><body/></html>"#);
        assert!(document.root.name.in_namespace(XHTML_NS));
        assert!(document.root.is_markup());
    }

    #[test]
    fn should_reject_roots_in_unknown_namespaces() {
        let err = Parser::new()
            .parse(r#"<x:root xmlns:x="urn:unknown"/>"#)
            .unwrap_err();
        assert!(matches!(err, CompilerError::UnknownNamespace { ref namespace } if namespace == "urn:unknown"));
    }

    #[test]
    fn should_report_malformed_markup() {
        let err = Parser::new().parse("<div><p></div>").unwrap_err();
        assert!(matches!(err, CompilerError::ParseError { .. }));
    }

    #[test]
    fn should_wrap_text_bodies() {
        let document = Parser::new().parse_text("Hello ${name}");
        assert!(document.root.name.is(META_NS, "text"));
        assert_eq!(document.root.text.map(|t| t.value), Some("Hello ${name}".to_string()));
    }

    #[test]
    fn should_serialize_elements_back_to_markup() {
        let document = parse(r#"<p class="a">x<b>y</b>z</p>"#);
        assert_eq!(to_markup(&document.root.children[0]), "<b>y</b>");
    }
}
