#[cfg(test)]
mod resolver_tests {
    use loxide as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;

    /// Scan, parse, and resolve; return the resolver diagnostics as strings.
    fn resolve_source(source: &str) -> Vec<String> {
        let tokens = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();

        assert!(
            parser.errors().is_empty(),
            "unexpected parse errors: {:?}",
            parser.errors()
        );

        let mut interpreter = Interpreter::new();
        let mut resolver = Resolver::new(&mut interpreter);

        resolver.resolve(&statements);

        resolver
            .into_errors()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_resolver_01_top_level_return() {
        assert_eq!(
            resolve_source("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_resolver_02_return_inside_function_is_fine() {
        assert!(resolve_source("fun f() { return 1; }").is_empty());
    }

    #[test]
    fn test_resolver_03_self_read_in_initializer() {
        assert_eq!(
            resolve_source("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        // At global scope the same shape is allowed.
        assert!(resolve_source("var a = 1; var b = a;").is_empty());
    }

    #[test]
    fn test_resolver_04_local_redeclaration() {
        assert_eq!(
            resolve_source("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );

        // Global redeclaration is permitted.
        assert!(resolve_source("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_resolver_05_self_inheritance() {
        assert_eq!(
            resolve_source("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_resolver_06_this_outside_class() {
        assert_eq!(
            resolve_source("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );

        assert_eq!(
            resolve_source("fun f() { return this; }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );

        assert!(resolve_source("class A { m() { return this; } }").is_empty());
    }

    #[test]
    fn test_resolver_07_super_misuse() {
        assert_eq!(
            resolve_source("super.m();"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );

        assert_eq!(
            resolve_source("class A { m() { super.m(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );

        assert!(resolve_source("class A {} class B < A { m() { super.m(); } }").is_empty());
    }

    #[test]
    fn test_resolver_08_initializer_returns() {
        assert_eq!(
            resolve_source("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        // A bare return in an initializer is allowed.
        assert!(resolve_source("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_resolver_09_errors_accumulate() {
        let errors = resolve_source("return 1;\nprint this;\n{ var a = a; }");

        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("Can't return from top-level code."));
        assert!(errors[1].contains("Can't use 'this' outside of a class."));
        assert!(errors[2].contains("Can't read local variable in its own initializer."));
    }

    #[test]
    fn test_resolver_10_parameters_and_shadowing() {
        // Duplicate parameters collide in the function scope.
        assert_eq!(
            resolve_source("fun f(a, a) {}"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );

        // Shadowing an outer binding in an inner scope is fine.
        assert!(resolve_source("var a = 1; { var a = 2; { var a = 3; } }").is_empty());
    }
}
