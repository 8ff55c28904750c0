#[cfg(test)]
mod interpreter_tests {
    use ember_interpreter as ember;

    use ember::error::LoxError;
    use ember::resolver::DepthPolicy;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    /// Runs `source` and returns what it printed, one entry per line.
    fn run(source: &str) -> Vec<String> {
        let mut out: Vec<u8> = Vec::new();

        if let Err(e) = ember::run(source, &mut out) {
            panic!("program failed: {}\n{}", e, source);
        }

        lines(out)
    }

    /// Runs `source`, expecting an error; returns the output printed before it
    /// and the error.
    fn run_err(source: &str) -> (Vec<String>, LoxError) {
        run_err_with(source, DepthPolicy::Lexical)
    }

    fn run_err_with(source: &str, policy: DepthPolicy) -> (Vec<String>, LoxError) {
        let mut out: Vec<u8> = Vec::new();
        let err = ember::run_with_policy(source, &mut out, policy).unwrap_err();

        (lines(out), err)
    }

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn arithmetic_and_display() {
        assert_eq!(
            run(indoc! {"
                println 1 + 2;
                println 10 / 4;
                println -3 * 2 - 1;
                println (1 + 2) * 3;
                println 0.1 + 0.2;
            "}),
            vec!["3", "2.5", "-7", "9", "0.30000000000000004"]
        );
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (out, err) = run_err("println 1;\nprintln 1 / 0;\nprintln 2;");

        assert_eq!(out, vec!["1"]);
        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "[line 2] Runtime error: Division by zero.");
    }

    #[test]
    fn strings_concatenate() {
        assert_eq!(
            run("var a = \"foo\"; println a + \"bar\";"),
            vec!["foobar"]
        );
    }

    #[test]
    fn mixed_plus_is_rejected() {
        let (_, err) = run_err("println 1 + \"a\";");

        assert_eq!(
            err.to_string(),
            "[line 1] Runtime error: Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn operand_type_errors() {
        let (_, err) = run_err("println \"a\" < 1;");
        assert_eq!(err.to_string(), "[line 1] Runtime error: Operands must be numbers.");

        let (_, err) = run_err("println -\"a\";");
        assert_eq!(err.to_string(), "[line 1] Runtime error: Operand must be a number.");
    }

    #[test]
    fn truthiness_and_logic() {
        assert_eq!(
            run(indoc! {"
                println !nil;
                println !0;
                println nil or \"default\";
                println 1 and 2;
                println false and undefined_name;
                println true or undefined_name;
            "}),
            vec!["true", "false", "default", "2", "false", "true"]
        );
    }

    #[test]
    fn equality() {
        assert_eq!(
            run(indoc! {"
                println nil == nil;
                println nil == false;
                println 1 == 1;
                println \"a\" == \"a\";
                println 1 == \"1\";
                def f() {}
                var g = f;
                println f == g;
                struct S {}
                println S() == S();
                var s = S();
                println s == s;
            "}),
            vec!["true", "false", "true", "true", "false", "true", "false", "true"]
        );
    }

    #[test]
    fn shadowing_does_not_leak() {
        assert_eq!(
            run(indoc! {"
                var a = \"global\";
                {
                    var a = \"inner\";
                    println a;
                }
                println a;
            "}),
            vec!["inner", "global"]
        );
    }

    #[test]
    fn closures_see_definition_scope() {
        assert_eq!(
            run(indoc! {"
                var a = \"global\";
                {
                    def show() { println a; }
                    show();
                    var a = \"block\";
                    show();
                }
            "}),
            vec!["global", "global"]
        );
    }

    #[test]
    fn counter_closure_keeps_state() {
        assert_eq!(
            run(indoc! {"
                def make_counter() {
                    var count = 0;
                    def counter() {
                        count = count + 1;
                        return count;
                    }
                    return counter;
                }
                var c = make_counter();
                println c();
                println c();
                var d = make_counter();
                println d();
            "}),
            vec!["1", "2", "1"]
        );
    }

    #[test]
    fn for_loop_counts() {
        assert_eq!(
            run("for (var i = 0; i < 3; i = i + 1) println i;"),
            vec!["0", "1", "2"]
        );
    }

    #[test]
    fn loop_closures_share_the_loop_variable() {
        assert_eq!(
            run(indoc! {"
                var first;
                var second;
                for (var i = 0; i < 2; i = i + 1) {
                    def show() { println i; }
                    if (first == nil) first = show; else second = show;
                }
                first();
                second();
            "}),
            vec!["2", "2"]
        );
    }

    #[test]
    fn break_inside_if_exits_only_the_loop() {
        assert_eq!(
            run(indoc! {"
                var i = 0;
                while (true) {
                    if (i == 3) break;
                    println i;
                    i = i + 1;
                }
                println \"after\";
                for (var j = 0; j < 2; j = j + 1) {
                    for (var k = 0; k < 10; k = k + 1) {
                        if (k == 1) break;
                        println j * 10 + k;
                    }
                }
            "}),
            vec!["0", "1", "2", "after", "0", "10"]
        );
    }

    #[test]
    fn return_unwinds_out_of_loops() {
        assert_eq!(
            run(indoc! {"
                def find(limit) {
                    var i = 0;
                    while (true) {
                        if (i * i > limit) return i;
                        i = i + 1;
                    }
                }
                println find(10);
                def nothing() { return; }
                println nothing();
                def implicit() {}
                println implicit();
            "}),
            vec!["4", "nil", "nil"]
        );
    }

    #[test]
    fn recursion() {
        assert_eq!(
            run(indoc! {"
                def fib(n) {
                    if (n < 2) return n;
                    return fib(n - 1) + fib(n - 2);
                }
                println fib(15);
            "}),
            vec!["610"]
        );
    }

    #[test]
    fn structs_construct_and_methods() {
        assert_eq!(
            run(indoc! {"
                struct P {
                    construct(a) { this.x = a; }
                    double() { return this.x * 2; }
                }
                var p = P(5);
                println p.x;
                println p.x == 5;
                println p.double();
                p.x = 7;
                println p.double();
                var m = p.double;
                println m();
            "}),
            vec!["5", "true", "10", "14", "14"]
        );
    }

    #[test]
    fn constructor_return_value_is_discarded() {
        assert_eq!(
            run(indoc! {"
                struct Box {
                    construct() { this.v = 1; return 42; }
                }
                println Box();
                println Box().v;
            "}),
            vec!["Box instance", "1"]
        );
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            run(indoc! {"
                struct S { name() { return \"method\"; } }
                var s = S();
                println s.name();
                s.name = \"field\";
                println s.name;
            "}),
            vec!["method", "field"]
        );
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        assert_eq!(
            run(indoc! {"
                struct Counter {
                    construct() { this.n = 0; }
                    inc() { this.n = this.n + 1; return this.n; }
                }
                var a = Counter();
                var b = Counter();
                var inc = a.inc;
                inc();
                inc();
                println a.n;
                println b.inc();
            "}),
            vec!["2", "1"]
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(
            run(indoc! {"
                def f() {}
                struct S {}
                println f;
                println clock;
                println S;
                println S();
                println true;
                println nil;
            "}),
            vec!["<fn f>", "<native fn clock>", "S", "S instance", "true", "nil"]
        );
    }

    #[test]
    fn clock_returns_seconds() {
        assert_eq!(
            run(indoc! {"
                var t = clock();
                println t > 1000000000;
                println clock() - t < 60;
            "}),
            vec!["true", "true"]
        );
    }

    #[test]
    fn arity_mismatch() {
        let (_, err) = run_err("def f(a, b) {}\nf(1);");
        assert_eq!(
            err.to_string(),
            "[line 2] Runtime error: Expected 2 arguments but got 1."
        );

        let (_, err) = run_err("struct S { construct(x) {} }\nS();");
        assert_eq!(
            err.to_string(),
            "[line 2] Runtime error: Expected 1 arguments but got 0."
        );
    }

    #[test]
    fn calling_a_non_callable() {
        let (_, err) = run_err("var x = 1;\nx();");

        assert_eq!(
            err.to_string(),
            "[line 2] Runtime error: Can only call functions and structs."
        );
    }

    #[test]
    fn property_errors() {
        let (_, err) = run_err("struct S {}\nprintln S().missing;");
        assert_eq!(err.to_string(), "[line 2] Runtime error: Undefined property 'missing'.");

        let (_, err) = run_err("var n = 1;\nprintln n.x;");
        assert_eq!(err.to_string(), "[line 2] Runtime error: Only instances have properties.");

        let (_, err) = run_err("var n = 1;\nn.x = 2;");
        assert_eq!(err.to_string(), "[line 2] Runtime error: Only instances have fields.");
    }

    #[test]
    fn undefined_variables() {
        let (_, err) = run_err("println nope;");
        assert_eq!(err.to_string(), "[line 1] Runtime error: Undefined variable 'nope'.");

        let (_, err) = run_err("nope = 1;");
        assert_eq!(err.to_string(), "[line 1] Runtime error: Undefined variable 'nope'.");
    }

    #[test]
    fn global_redefinition_is_allowed() {
        assert_eq!(run("var a = 1; var a = a + 1; println a;"), vec!["2"]);
    }

    #[test]
    fn static_errors_stop_before_execution() {
        let (out, err) = run_err("println 1;\n{ var a = a; }");

        assert!(out.is_empty());
        assert!(!err.is_runtime());
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn function_relative_depths_lose_block_captures() {
        let source = "{ var x = 1; def f() { return x; } println f(); }";

        assert_eq!(run(source), vec!["1"]);

        let (out, err) = run_err_with(source, DepthPolicy::FunctionRelative);
        assert!(out.is_empty());
        assert_eq!(err.to_string(), "[line 1] Runtime error: Undefined variable 'x'.");
    }

    #[test]
    fn function_relative_depths_lose_this() {
        let source = indoc! {"
            struct S {
                get() { return this; }
            }
            println S().get();
        "};

        assert_eq!(run(source), vec!["S instance"]);

        let (_, err) = run_err_with(source, DepthPolicy::FunctionRelative);
        assert_eq!(err.to_string(), "[line 2] Runtime error: Undefined variable 'this'.");
    }

    #[test]
    fn deep_recursion_completes() {
        assert_eq!(
            run(indoc! {"
                def depth(n) {
                  if (n == 0) return 0;
                  return depth(n - 1) + 1;
                }
                println depth(5000);
            "}),
            vec!["5000"]
        );
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let (out, err) = run_err(indoc! {"
            println \"before\";
            def forever(n) {
              return forever(n + 1);
            }
            forever(0);
        "});

        assert_eq!(out, vec!["before"]);
        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "[line 3] Runtime error: Stack overflow.");
    }

    #[test]
    fn closures_survive_frame_collection() {
        assert_eq!(
            run(indoc! {"
                def make_counter() {
                  var n = 0;
                  def count() {
                    n = n + 1;
                    return n;
                  }
                  return count;
                }

                var global_counter = make_counter();
                var last;
                for (var i = 0; i < 3000; i = i + 1) {
                  make_counter()();
                  last = global_counter();
                }
                println last;

                {
                  var local_counter = make_counter();
                  for (var i = 0; i < 3000; i = i + 1) {
                    make_counter()();
                    local_counter();
                  }
                  println local_counter();
                }
            "}),
            vec!["3000", "3001"]
        );
    }

    #[test]
    fn instances_keep_their_methods_and_fields_across_collection() {
        assert_eq!(
            run(indoc! {"
                def make_counter() {
                  var n = 0;
                  def count() {
                    n = n + 1;
                    return n;
                  }
                  return count;
                }

                struct Holder {
                  construct(tick) {
                    this.tick = tick;
                  }
                  next() {
                    return this.tick();
                  }
                }

                var holder = Holder(make_counter());
                for (var i = 0; i < 3000; i = i + 1) {
                  holder.next();
                }
                println holder.next();
                println holder.tick();
            "}),
            vec!["3001", "3002"]
        );
    }
}
