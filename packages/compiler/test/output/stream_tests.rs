/**
 * Code Stream Tests
 *
 * Literal merging, temporaries, scopes and assembly of the emitted lines
 * into a program.
 */

#[cfg(test)]
mod tests {
    use pagetemplate_compiler::expression_parser::Expr;
    use pagetemplate_compiler::output::stream::Scope;
    use pagetemplate_compiler::output::{CodeStream, Line, ProgramKind, StmtKind, Target};
    use pagetemplate_compiler::{CompilerError, Symbols};
    use pretty_assertions::assert_eq;

    fn stream(parameters: &[&str]) -> CodeStream {
        let parameters: Vec<String> = parameters.iter().map(|name| name.to_string()).collect();
        CodeStream::new(Symbols::default(), &parameters)
    }

    #[test]
    fn should_flush_literals_before_other_lines() {
        let mut stream = stream(&[]);
        stream.out("<p>");
        stream.write(Line::Write {
            value: Expr::name("x"),
            structure: false,
        });
        stream.out("</p>");
        stream.cook();
        assert_eq!(
            stream.source(),
            ["_write('<p>')", "_write(escape(x))", "_write('</p>')"].join("\n")
        );
    }

    #[test]
    fn should_bind_parameters_in_the_outer_scope() {
        let mut stream = stream(&["user"]);
        assert!(stream.is_bound("user"));
        assert!(!stream.is_bound_outside("user"));
        stream.scope.push(Scope::new());
        assert!(stream.is_bound_outside("user"));
    }

    #[test]
    fn should_hide_internal_names() {
        let mut stream = stream(&["user"]);
        stream.innermost().insert("_slot_body".to_string());
        stream.innermost().insert("item".to_string());
        let visible = stream.visible_names();
        assert!(visible.contains(&"user".to_string()));
        assert!(visible.contains(&"item".to_string()));
        assert!(visible.iter().all(|name| !name.starts_with('_')));
    }

    #[test]
    fn should_reject_unbalanced_indentation() {
        let mut stream = stream(&[]);
        assert!(matches!(stream.outdent(), Err(CompilerError::Internal(_))));
        stream.indent();
        let err = stream.finish(ProgramKind::Template, vec![]).unwrap_err();
        assert!(err.to_string().contains("indentation 1"));
    }

    #[test]
    fn should_reject_leaked_temporaries() {
        let mut stream = stream(&[]);
        stream.save();
        let err = stream.finish(ProgramKind::Template, vec![]).unwrap_err();
        assert!(err.to_string().contains("temporaries left allocated"));
    }

    #[test]
    fn should_assemble_blocks() {
        let mut stream = stream(&["a"]);
        stream.write(Line::If(Expr::name("a")));
        stream.indent();
        stream.out("yes");
        stream.outdent().unwrap();
        stream.write(Line::Else);
        stream.indent();
        stream.out("no");
        stream.outdent().unwrap();
        stream.out("!");
        let program = stream.finish(ProgramKind::Template, vec!["a".to_string()]).unwrap();

        assert_eq!(program.body.len(), 2);
        match &program.body[0].kind {
            StmtKind::If { body, orelse, .. } => {
                assert_eq!(body.len(), 1);
                assert_eq!(orelse.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected an if statement, got {:?}", other),
        }
        assert_eq!(
            program.source(),
            "if a:\n    _write('yes')\nelse:\n    _write('no')\n_write('!')\n"
        );
    }

    #[test]
    fn should_record_annotations() {
        let mut stream = stream(&[]);
        stream.out("<p>");
        stream.annotate("user/name");
        stream.write(Line::Assign {
            target: Target::Temp(1),
            value: Expr::name("x"),
        });
        stream.write(Line::Literal("tail".to_string()));
        let program = stream.finish(ProgramKind::Template, vec![]).unwrap();
        assert_eq!(program.annotation_for(0), None);
        assert_eq!(program.annotation_for(1), Some((1, "user/name")));
        assert_eq!(program.annotation_for(2), Some((1, "user/name")));
    }

    #[test]
    fn should_serialize_programs() {
        let mut stream = stream(&[]);
        stream.out("<p/>");
        let program = stream.finish(ProgramKind::Macro, vec![]).unwrap();
        let json = serde_json::to_string(&program).unwrap();
        let restored: pagetemplate_compiler::Program = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, program);
    }
}
