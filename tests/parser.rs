#[cfg(test)]
mod parser_tests {
    use loxide as lox;

    use lox::ast::Stmt;
    use lox::ast_printer::AstPrinter;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn parse_source(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();

        let errors = parser
            .take_errors()
            .iter()
            .map(|e| e.to_string())
            .collect();

        (statements, errors)
    }

    /// Parse a single statement and return its prefix form.
    fn print_stmt(source: &str) -> String {
        let (statements, errors) = parse_source(source);

        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        assert_eq!(statements.len(), 1);

        AstPrinter::print_stmt(&statements[0])
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(print_stmt("1 + 2 * 3;"), "(; (+ 1.0 (* 2.0 3.0)))");
        assert_eq!(print_stmt("(1 + 2) * 3;"), "(; (* (group (+ 1.0 2.0)) 3.0))");
        assert_eq!(print_stmt("1 < 2 == true;"), "(; (== (< 1.0 2.0) true))");
        assert_eq!(print_stmt("-1 - -2;"), "(; (- (- 1.0) (- 2.0)))");
    }

    #[test]
    fn test_parser_02_logical_operators() {
        assert_eq!(print_stmt("a or b and c;"), "(; (or a (and b c)))");
        assert_eq!(print_stmt("!a or !b;"), "(; (or (! a) (! b)))");
    }

    #[test]
    fn test_parser_03_assignment_is_right_associative() {
        assert_eq!(print_stmt("a = b = 1;"), "(; (= a (= b 1.0)))");
    }

    #[test]
    fn test_parser_04_var_declarations() {
        assert_eq!(print_stmt("var a = 1;"), "(var a = 1.0)");
        assert_eq!(print_stmt("var a;"), "(var a)");
        assert_eq!(print_stmt("var s = \"hi\";"), "(var s = hi)");
    }

    #[test]
    fn test_parser_05_control_flow() {
        assert_eq!(
            print_stmt("if (a) print 1; else print 2;"),
            "(if-else a (print 1.0) (print 2.0))"
        );
        assert_eq!(print_stmt("if (a) print 1;"), "(if a (print 1.0))");
        assert_eq!(
            print_stmt("while (a < 3) a = a + 1;"),
            "(while (< a 3.0) (; (= a (+ a 1.0))))"
        );
        assert_eq!(
            print_stmt("{ print 1; print 2; }"),
            "(block (print 1.0) (print 2.0))"
        );
    }

    #[test]
    fn test_parser_06_for_desugars_to_while() {
        assert_eq!(
            print_stmt("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(block (var i = 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
        );

        // No clauses at all: bare while over a true literal.
        assert_eq!(print_stmt("for (;;) print 1;"), "(while true (print 1.0))");

        // Initializer only.
        assert_eq!(
            print_stmt("for (var i = 0;;) print i;"),
            "(block (var i = 0.0) (while true (print i)))"
        );

        // Condition only: no enclosing block.
        assert_eq!(
            print_stmt("for (; a < 2;) print a;"),
            "(while (< a 2.0) (print a))"
        );
    }

    #[test]
    fn test_parser_07_functions_and_returns() {
        assert_eq!(
            print_stmt("fun add(a, b) { return a + b; }"),
            "(fun add(a b) (return (+ a b)))"
        );
        assert_eq!(print_stmt("fun f() { return; }"), "(fun f() (return))");
    }

    #[test]
    fn test_parser_08_calls_and_properties() {
        assert_eq!(print_stmt("f(1, 2);"), "(; (call f 1.0 2.0))");
        assert_eq!(print_stmt("f()();"), "(; (call (call f)))");
        assert_eq!(print_stmt("a.b.c;"), "(; (. (. a b) c))");
        assert_eq!(
            print_stmt("a.b.c(1).d = 2;"),
            "(; (= (call (. (. a b) c) 1.0) d 2.0))"
        );
    }

    #[test]
    fn test_parser_09_classes() {
        assert_eq!(
            print_stmt("class A { m() { return 1; } }"),
            "(class A (fun m() (return 1.0)))"
        );
        assert_eq!(
            print_stmt("class B < A { m() { super.m(); } }"),
            "(class B < A (fun m() (; (call (super m)))))"
        );
        assert_eq!(
            print_stmt("class C { init(x) { this.x = x; } }"),
            "(class C (fun init(x) (; (= this x x))))"
        );
    }

    #[test]
    fn test_parser_10_invalid_assignment_target() {
        let (statements, errors) = parse_source("1 = 2;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );

        // The expression itself survives; parsing does not enter panic mode.
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_11_panic_mode_recovery() {
        let (statements, errors) = parse_source("var = 1;\nprint 2;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '=': Expect variable name."]
        );

        // Recovery resumes at the statement boundary.
        assert_eq!(statements.len(), 1);
        assert_eq!(AstPrinter::print_stmt(&statements[0]), "(print 2.0)");
    }

    #[test]
    fn test_parser_12_error_at_end() {
        let (_, errors) = parse_source("print 1");

        assert_eq!(
            errors,
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_parser_13_super_requires_method_access() {
        let (_, errors) = parse_source("super;");

        assert_eq!(errors, vec!["[line 1] Error at ';': Expect '.' after 'super'."]);
    }

    #[test]
    fn test_parser_14_too_many_arguments() {
        let args = (0..256).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
        let source = format!("f({});", args);

        let (statements, errors) = parse_source(&source);

        assert!(errors
            .iter()
            .any(|e| e.contains("Can't have more than 255 arguments.")));

        // The call still parses with all of its arguments.
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_15_too_many_parameters() {
        let params = (0..256)
            .map(|i| format!("p{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let source = format!("fun f({}) {{}}", params);

        let (_, errors) = parse_source(&source);

        assert!(errors
            .iter()
            .any(|e| e.contains("Can't have more than 255 parameters.")));
    }

    #[test]
    fn test_parser_16_print_is_whitespace_insensitive() {
        // Formatting noise never changes the parsed shape.
        let pairs = [
            ("print 1+2*3;", "print 1 + 2 * 3;"),
            ("var a=(1+2)*3;", "var a = (1 + 2) * 3;"),
            (
                "if(a or b)print a;else print b;",
                "if (a or b)\n  print a;\nelse\n  print b;",
            ),
            ("fun f(x){return x;}", "fun f(x) { return x; }"),
        ];

        for (compact, spaced) in pairs {
            assert_eq!(print_stmt(compact), print_stmt(spaced));
        }
    }
}
