#[cfg(test)]
mod resolver_tests {
    use ember_interpreter as ember;

    use ember::ast::{Expr, ExprId, Stmt};
    use ember::interpreter::Interpreter;
    use ember::parser::Parser;
    use ember::resolver::{DepthPolicy, Resolver};
    use ember::scanner::scan;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn resolve_error(source: &str) -> String {
        let tokens = scan(source).unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());

        let err = Resolver::new(&mut interpreter)
            .resolve(&statements)
            .unwrap_err();

        err.to_string()
    }

    /// Ids of every read of `name`, in source order.
    fn reads_of(statements: &[Stmt<'_>], name: &str) -> Vec<ExprId> {
        fn walk_stmt(stmt: &Stmt<'_>, name: &str, ids: &mut Vec<ExprId>) {
            match stmt {
                Stmt::Expression(expr) | Stmt::Print(expr) => walk_expr(expr, name, ids),
                Stmt::Var { initializer, .. } => {
                    if let Some(expr) = initializer {
                        walk_expr(expr, name, ids);
                    }
                }
                Stmt::Block(statements) => statements.iter().for_each(|s| walk_stmt(s, name, ids)),
                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    walk_expr(condition, name, ids);
                    walk_stmt(then_branch, name, ids);
                    if let Some(else_branch) = else_branch {
                        walk_stmt(else_branch, name, ids);
                    }
                }
                Stmt::While { condition, body } => {
                    walk_expr(condition, name, ids);
                    walk_stmt(body, name, ids);
                }
                Stmt::Function(function) => function.body.iter().for_each(|s| walk_stmt(s, name, ids)),
                Stmt::Return { value, .. } => {
                    if let Some(expr) = value {
                        walk_expr(expr, name, ids);
                    }
                }
                Stmt::Class { methods, .. } => methods
                    .iter()
                    .flat_map(|m| m.body.iter())
                    .for_each(|s| walk_stmt(s, name, ids)),
            }
        }

        fn walk_expr(expr: &Expr<'_>, name: &str, ids: &mut Vec<ExprId>) {
            match expr {
                Expr::Variable { id, name: token } if token.lexeme == name => ids.push(*id),
                Expr::This { id, .. } if name == "this" => ids.push(*id),
                Expr::Unary { right, .. } => walk_expr(right, name, ids),
                Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                    walk_expr(left, name, ids);
                    walk_expr(right, name, ids);
                }
                Expr::Grouping(inner) => walk_expr(inner, name, ids),
                Expr::Assign { value, .. } => walk_expr(value, name, ids),
                Expr::Call {
                    callee, arguments, ..
                } => {
                    walk_expr(callee, name, ids);
                    arguments.iter().for_each(|a| walk_expr(a, name, ids));
                }
                Expr::Get { object, .. } => walk_expr(object, name, ids),
                Expr::Set { object, value, .. } => {
                    walk_expr(object, name, ids);
                    walk_expr(value, name, ids);
                }
                _ => {}
            }
        }

        let mut ids = Vec::new();
        statements.iter().for_each(|s| walk_stmt(s, name, &mut ids));
        ids
    }

    fn depths(source: &str, name: &str, policy: DepthPolicy) -> Vec<Option<usize>> {
        let tokens = scan(source).unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());

        Resolver::with_policy(&mut interpreter, policy)
            .resolve(&statements)
            .unwrap();

        reads_of(&statements, name)
            .into_iter()
            .map(|id| interpreter.resolved_depth(id))
            .collect()
    }

    const NESTED: &str = indoc! {"
        {
            var a = 1;
            {
                println a;
            }
            def f() {
                return a;
            }
        }
        println a;
    "};

    #[test]
    fn lexical_depths_count_every_scope() {
        assert_eq!(
            depths(NESTED, "a", DepthPolicy::Lexical),
            vec![Some(1), Some(1), None]
        );
    }

    #[test]
    fn function_relative_depths_collapse_captures() {
        assert_eq!(
            depths(NESTED, "a", DepthPolicy::FunctionRelative),
            vec![Some(1), Some(0), None]
        );
    }

    #[test]
    fn function_relative_depths_collapse_this_and_nested_block_captures() {
        let methods = indoc! {"
            struct S {
                get() { return this; }
                nested() { def inner() { return this; } return inner; }
            }
        "};
        assert_eq!(
            depths(methods, "this", DepthPolicy::FunctionRelative),
            vec![Some(0), Some(0)]
        );

        let nested = "def outer() { var x; { def inner() { return x; } } }";
        assert_eq!(depths(nested, "x", DepthPolicy::Lexical), vec![Some(2)]);
        assert_eq!(depths(nested, "x", DepthPolicy::FunctionRelative), vec![Some(0)]);
    }

    #[test]
    fn top_level_names_are_global() {
        let source = "var g = 1; def f() { return g; } println g;";

        assert_eq!(depths(source, "g", DepthPolicy::Lexical), vec![None, None]);
    }

    #[test]
    fn this_resolves_one_scope_above_method_body() {
        let source = indoc! {"
            struct S {
                get() { return this; }
                nested() { def inner() { return this; } return inner; }
            }
        "};

        assert_eq!(
            depths(source, "this", DepthPolicy::Lexical),
            vec![Some(1), Some(2)]
        );
    }

    #[test]
    fn rejects_read_in_own_initializer() {
        assert_eq!(
            resolve_error("{ var a = a; }"),
            "[line 1] Error: Can't read local variable in its own initializer."
        );
    }

    #[test]
    fn global_initializer_may_mention_itself() {
        let tokens = scan("var a = a;").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());

        assert!(Resolver::new(&mut interpreter).resolve(&statements).is_ok());
    }

    #[test]
    fn rejects_top_level_return() {
        assert_eq!(
            resolve_error("return 1;"),
            "[line 1] Error: Can't return from top-level code."
        );
    }

    #[test]
    fn rejects_duplicate_local() {
        assert_eq!(
            resolve_error("{\n  var a = 1;\n  var a = 2;\n}"),
            "[line 3] Error: Already a variable with this name in this scope."
        );
        assert_eq!(
            resolve_error("def f(x, x) {}"),
            "[line 1] Error: Already a variable with this name in this scope."
        );
    }

    #[test]
    fn rejects_break_outside_loop() {
        assert_eq!(
            resolve_error("break;"),
            "[line 1] Error: Can't use 'break' outside of a loop."
        );
        assert_eq!(
            resolve_error("while (true) { def f() { break; } }"),
            "[line 1] Error: Can't use 'break' outside of a loop."
        );
    }

    #[test]
    fn rejects_break_as_value() {
        assert_eq!(
            resolve_error("while (true) { var x = break; }"),
            "[line 1] Error: 'break' can only be used as a statement."
        );
    }

    #[test]
    fn rejects_this_outside_struct() {
        assert_eq!(
            resolve_error("println this;"),
            "[line 1] Error: Can't use 'this' outside of a struct."
        );
        assert_eq!(
            resolve_error("def f() { return this; }"),
            "[line 1] Error: Can't use 'this' outside of a struct."
        );
    }
}
