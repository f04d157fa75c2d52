/**
 * Clause Tests
 *
 * Each clause balances in `end` what it opened in `begin`; the listings
 * below show the program lines a clause sequence produces.
 */

#[cfg(test)]
mod tests {
    use pagetemplate_compiler::output::clauses::{begin_all, end_all};
    use pagetemplate_compiler::output::stream::Scope;
    use pagetemplate_compiler::output::{
        Clause, ClauseEmitter, CodeStream, Declaration, Tag, Target, ValueExpr,
    };
    use pagetemplate_compiler::{CompilerError, Symbols};
    use pretty_assertions::assert_eq;

    /// Emits a nested node as its literal text.
    struct LiteralEmitter {
        stream: CodeStream,
    }

    impl ClauseEmitter for LiteralEmitter {
        type Node = String;

        fn stream(&mut self) -> &mut CodeStream {
            &mut self.stream
        }

        fn visit(&mut self, node: &String) -> Result<(), CompilerError> {
            self.stream.out(node);
            Ok(())
        }
    }

    fn emit_with(parameters: &[&str], clauses: &[Clause<String>]) -> CodeStream {
        let parameters: Vec<String> = parameters.iter().map(|name| name.to_string()).collect();
        let mut emitter = LiteralEmitter {
            stream: CodeStream::new(Symbols::default(), &parameters),
        };
        begin_all(clauses, &mut emitter).unwrap();
        end_all(clauses, &mut emitter).unwrap();
        emitter.stream.cook();
        emitter.stream
    }

    fn emit(clauses: &[Clause<String>]) -> String {
        emit_with(&[], clauses).source()
    }

    #[test]
    fn should_guard_content_with_a_condition() {
        let clauses = vec![
            Clause::condition(ValueExpr::name("flag")),
            Clause::Tag(Tag::new("div")),
            Clause::Write(ValueExpr::name("x").escape()),
        ];
        assert_eq!(
            emit(&clauses),
            [
                "_tmp1 = flag",
                "if _tmp1:",
                "    _write('<div>')",
                "    _write(escape(x))",
                "    _write('</div>')",
            ]
            .join("\n")
        );
    }

    #[test]
    fn should_reguard_the_closing_tag_of_an_omitted_element() {
        let clauses = vec![
            Clause::Condition {
                value: ValueExpr::name("flag"),
                clauses: vec![Clause::Tag(Tag::new("b"))],
                finalize: false,
            },
            Clause::out("x"),
        ];
        assert_eq!(
            emit(&clauses),
            [
                "_tmp1 = flag",
                "if _tmp1:",
                "    _write('<b>')",
                "_write('x')",
                "if _tmp1:",
                "    _write('</b>')",
            ]
            .join("\n")
        );
    }

    #[test]
    fn should_try_alternatives_in_order() {
        let clauses = vec![Clause::Assign {
            value: ValueExpr::parts(vec![ValueExpr::name("a"), ValueExpr::name("b")]),
            target: Target::Var("x".to_string()),
        }];
        assert_eq!(
            emit(&clauses),
            ["try:", "    x = a", "except:", "    x = b"].join("\n")
        );
    }

    #[test]
    fn should_restore_shadowed_names() {
        let mut emitter = LiteralEmitter {
            stream: CodeStream::new(Symbols::default(), &["x".to_string()]),
        };
        emitter.stream.scope.push(Scope::new());
        let clauses = vec![Clause::define(
            Declaration::new(["x"]),
            ValueExpr::name("y"),
        )];
        begin_all(&clauses, &mut emitter).unwrap();
        assert!(emitter.stream.is_bound("x"));
        end_all(&clauses, &mut emitter).unwrap();
        assert_eq!(
            emitter.stream.source(),
            ["_tmp1 = x", "x = y", "x = _tmp1"].join("\n")
        );
    }

    #[test]
    fn should_unbind_names_that_were_not_bound_before() {
        let clauses = vec![Clause::define(Declaration::new(["x"]), ValueExpr::name("y"))];
        assert_eq!(emit(&clauses), ["x = y", "del x"].join("\n"));
    }

    #[test]
    fn should_leave_global_definitions_bound() {
        let clauses = vec![Clause::define(
            Declaration::global(["x"]),
            ValueExpr::name("y"),
        )];
        assert_eq!(emit(&clauses), "x = y");
    }

    #[test]
    fn should_track_repeat_state_for_single_names() {
        let clauses = vec![
            Clause::Repeat {
                declaration: Declaration::new(["item"]),
                value: ValueExpr::name("items"),
                repeatdict: true,
            },
            Clause::Write(ValueExpr::name("item").escape()),
        ];
        assert_eq!(
            emit(&clauses),
            [
                "_tmp1 = items",
                "for item in repeat.insert('item', _tmp1):",
                "    _write(escape(item))",
                "del item",
            ]
            .join("\n")
        );
    }

    #[test]
    fn should_not_track_repeat_state_when_unpacking() {
        let clauses = vec![Clause::Repeat {
            declaration: Declaration::new(["k", "v"]),
            value: ValueExpr::name("pairs"),
            repeatdict: true,
        }];
        let source = emit(&clauses);
        assert!(source.contains("for (k, v) in _tmp1:"));
    }

    #[test]
    fn should_run_deferred_groups_after_children() {
        let clauses = vec![
            Clause::Group {
                clauses: vec![Clause::out("after")],
                defer: true,
            },
            Clause::Visit("child".to_string()),
            Clause::deferred("!"),
        ];
        assert_eq!(emit(&clauses), "_write('child!after')");
    }

    #[test]
    fn should_write_static_and_dynamic_attributes() {
        let mut tag = Tag::new("a");
        tag.attributes.push(("href".to_string(), "/x&y".to_string()));
        tag.dynamic.push(("title".to_string(), ValueExpr::name("t")));
        assert_eq!(
            emit(&[Clause::Tag(tag)]),
            [
                "_write('<a href=\"/x&amp;y\"')",
                "_tmp1 = t",
                "_attribute('title', _tmp1)",
                "_write('></a>')",
            ]
            .join("\n")
        );
    }

    #[test]
    fn should_self_close_empty_tags() {
        let mut tag = Tag::new("br");
        tag.selfclosing = true;
        assert_eq!(emit(&[Clause::Tag(tag)]), "_write('<br />')");
    }

    #[test]
    fn should_write_structure_unescaped() {
        assert_eq!(
            emit(&[Clause::Write(ValueExpr::name("html"))]),
            "_write(html)"
        );
        assert_eq!(
            emit(&[Clause::UnicodeWrite(ValueExpr::name("html").escape())]),
            "_write(html)"
        );
    }

    #[test]
    fn should_capture_into_a_buffer() {
        let clauses = vec![Clause::Capture {
            target: Target::Var("_slot_x".to_string()),
            clauses: vec![Clause::out("hi")],
        }];
        assert_eq!(
            emit(&clauses),
            ["with capture() as _slot_x:", "    _write('hi')"].join("\n")
        );
    }

    #[test]
    fn should_balance_every_clause() {
        let clauses = vec![
            Clause::condition(ValueExpr::name("a")),
            Clause::Repeat {
                declaration: Declaration::new(["item"]),
                value: ValueExpr::name("items"),
                repeatdict: false,
            },
            Clause::define(Declaration::new(["x"]), ValueExpr::name("item")),
            Clause::Write(ValueExpr::name("x").escape()),
        ];
        let stream = emit_with(&["a", "items"], &clauses);
        assert_eq!(stream.indentation(), 0);
        assert!(stream
            .finish(pagetemplate_compiler::ProgramKind::Template, vec![])
            .is_ok());
    }
}
