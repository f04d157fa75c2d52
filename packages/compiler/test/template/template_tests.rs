/**
 * File Template Tests
 *
 * Templates read from disk: includes, reloading, the program cache on disk
 * and listing dumps.
 */

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use pagetemplate_compiler::runtime::params_from_json;
    use pagetemplate_compiler::{
        CompilerConfig, ConfigFlags, Environment, PageTemplate, PageTemplateFile, TemplateError,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// A scratch directory removed when dropped.
    struct Scratch {
        path: PathBuf,
    }

    impl Scratch {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "pagetemplate-{}-{}",
                name,
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).unwrap();
            Scratch { path }
        }

        fn write(&self, name: &str, body: &str) -> PathBuf {
            let path = self.path.join(name);
            fs::write(&path, body).unwrap();
            path
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn env(flags: ConfigFlags) -> Arc<Environment> {
        Arc::new(Environment::new(CompilerConfig::default().with_flags(flags)))
    }

    fn touch_later(path: &Path) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();
    }

    #[test]
    fn should_render_file_templates() {
        let scratch = Scratch::new("render");
        let path = scratch.write("page.pt", r#"<p tal:content="name"/>"#);
        let template = PageTemplateFile::new(&path, env(ConfigFlags::empty()));
        assert_eq!(
            template.render(params_from_json(json!({"name": "Ada"}))).unwrap(),
            "<p>Ada</p>"
        );
        assert_eq!(template.path(), path.as_path());
    }

    #[test]
    fn should_render_plain_text_files() {
        let scratch = Scratch::new("text");
        let path = scratch.write("mail.txt", "Dear ${name} <3");
        let template = PageTemplateFile::text(&path, env(ConfigFlags::empty()));
        assert_eq!(
            template.render(params_from_json(json!({"name": "Ada"}))).unwrap(),
            "Dear Ada <3"
        );
    }

    #[test]
    fn should_include_files_relative_to_the_template() {
        let scratch = Scratch::new("include");
        scratch.write("part.pt", r#"<b tal:content="name"/>"#);
        scratch.write("note.txt", "a < b");
        let path = scratch.write(
            "main.pt",
            r#"<div><xi:include href="part.pt"/>|<xi:include href="note.txt" parse="text"/></div>"#,
        );
        let template = PageTemplateFile::new(&path, env(ConfigFlags::empty()));
        assert_eq!(
            template.render(params_from_json(json!({"name": "Ada"}))).unwrap(),
            "<div><b>Ada</b>|a &lt; b</div>"
        );
    }

    #[test]
    fn should_reject_includes_outside_file_templates() {
        let template = PageTemplate::new(
            r#"<div><xi:include href="part.pt"/></div>"#,
            env(ConfigFlags::empty()),
        )
        .unwrap();
        let err = template.render(params_from_json(json!({}))).unwrap_err();
        assert!(err.to_string().contains("outside a file template"));
    }

    #[test]
    fn should_report_missing_files() {
        let scratch = Scratch::new("missing");
        let template =
            PageTemplateFile::new(scratch.path.join("nope.pt"), env(ConfigFlags::empty()));
        let err = template.render(params_from_json(json!({}))).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }

    #[test]
    fn should_reload_changed_files() {
        let scratch = Scratch::new("reload");
        let path = scratch.write("page.pt", "<p>one</p>");
        let template =
            PageTemplateFile::new(&path, env(ConfigFlags::empty())).with_auto_reload(true);
        assert_eq!(template.render(params_from_json(json!({}))).unwrap(), "<p>one</p>");

        fs::write(&path, "<p>two</p>").unwrap();
        touch_later(&path);
        assert_eq!(template.render(params_from_json(json!({}))).unwrap(), "<p>two</p>");
    }

    #[test]
    fn should_keep_the_first_read_without_auto_reload() {
        let scratch = Scratch::new("no-reload");
        let path = scratch.write("page.pt", "<p>one</p>");
        let template = PageTemplateFile::new(&path, env(ConfigFlags::empty()));
        assert_eq!(template.render(params_from_json(json!({}))).unwrap(), "<p>one</p>");

        fs::write(&path, "<p>two</p>").unwrap();
        touch_later(&path);
        assert_eq!(template.render(params_from_json(json!({}))).unwrap(), "<p>one</p>");
    }

    #[test]
    fn should_persist_programs_beside_the_template() {
        let scratch = Scratch::new("disk-cache");
        let path = scratch.write("page.pt", r#"<p tal:content="name"/>"#);
        let cache = scratch.path.join("page.pt.cache");

        let first = PageTemplateFile::new(&path, env(ConfigFlags::DISK_CACHE));
        first.render(params_from_json(json!({"name": "a"}))).unwrap();
        first.render(params_from_json(json!({"name": "a", "extra": 1}))).unwrap();
        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
        assert_eq!(stored["programs"].as_array().map(Vec::len), Some(2));

        // A fresh template over the same body renders from the stored programs.
        let second = PageTemplateFile::new(&path, env(ConfigFlags::DISK_CACHE));
        assert_eq!(
            second.render(params_from_json(json!({"name": "b"}))).unwrap(),
            "<p>b</p>"
        );

        // A changed body replaces the stale entries.
        fs::write(&path, r#"<i tal:content="name"/>"#).unwrap();
        let third = PageTemplateFile::new(&path, env(ConfigFlags::DISK_CACHE));
        assert_eq!(
            third.render(params_from_json(json!({"name": "c"}))).unwrap(),
            "<i>c</i>"
        );
        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
        assert_eq!(stored["programs"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn should_ignore_corrupt_caches() {
        let scratch = Scratch::new("corrupt-cache");
        let path = scratch.write("page.pt", "<p>ok</p>");
        scratch.write("page.pt.cache", "{not json");
        let template = PageTemplateFile::new(&path, env(ConfigFlags::DISK_CACHE));
        assert_eq!(template.render(params_from_json(json!({}))).unwrap(), "<p>ok</p>");
    }

    #[test]
    fn should_dump_listings_in_debug_mode() {
        let scratch = Scratch::new("debug");
        let path = scratch.write("page.pt", r#"<p tal:content="name"/>"#);
        let template = PageTemplateFile::new(&path, env(ConfigFlags::DEBUG));
        template.render(params_from_json(json!({"name": "x"}))).unwrap();
        let listing = fs::read_to_string(scratch.path.join("page.pt.src")).unwrap();
        assert!(listing.contains("_write('<p>')"), "{}", listing);
    }

    #[test]
    fn should_expose_file_macros() {
        let scratch = Scratch::new("macros");
        let layout = scratch.write(
            "layout.pt",
            r#"<html><h1 metal:define-macro="head" tal:content="title"/></html>"#,
        );
        let layout = PageTemplateFile::new(&layout, env(ConfigFlags::empty()));
        let page = PageTemplate::new(
            r#"<div metal:use-macro="layout/head"/>"#,
            env(ConfigFlags::empty()),
        )
        .unwrap();
        let mut params = params_from_json(json!({"title": "T"}));
        params.insert("layout".to_string(), layout.macros().unwrap());
        assert_eq!(page.render(params).unwrap(), "<h1>T</h1>");
    }
}
