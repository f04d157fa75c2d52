//! Namespace URIs understood by the compiler and the prefixes bound to them
//! when a template leaves them undeclared.

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const TAL_NS: &str = "http://xml.zope.org/namespaces/tal";
pub const META_NS: &str = "http://xml.zope.org/namespaces/meta";
pub const METAL_NS: &str = "http://xml.zope.org/namespaces/metal";
pub const I18N_NS: &str = "http://xml.zope.org/namespaces/i18n";
pub const PY_NS: &str = "http://genshi.edgewall.org";
pub const XI_NS: &str = "http://www.w3.org/2001/XInclude";

/// Standard prefix bindings, injected on the root element when missing.
pub const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("tal", TAL_NS),
    ("metal", METAL_NS),
    ("i18n", I18N_NS),
    ("meta", META_NS),
    ("py", PY_NS),
    ("xi", XI_NS),
];

/// Namespaces whose attributes are directives and whose declarations are
/// never written to the output.
pub fn is_directive_namespace(uri: &str) -> bool {
    matches!(uri, TAL_NS | METAL_NS | I18N_NS | META_NS | PY_NS | XI_NS)
}

/// Namespaces a root element may live in.
pub fn is_known_root_namespace(uri: &str) -> bool {
    uri == XHTML_NS || is_directive_namespace(uri)
}
