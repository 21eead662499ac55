#[cfg(test)]
mod scanner_tests {
    use loxide as lox;

    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == > >= < <= / -",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var x = true; while fortune class_",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::TRUE, "true"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::IDENTIFIER, "fortune"),
                (TokenType::IDENTIFIER, "class_"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_numbers() {
        let scanner = Scanner::new(b"123 45.67 8.");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 5);

        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 123.0));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 45.67));

        // A trailing dot is not part of the number.
        assert!(matches!(tokens[2].token_type, TokenType::NUMBER(n) if n == 8.0));
        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_05_strings() {
        let scanner = Scanner::new(b"\"hello\" \"multi\nline\"");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);

        assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "hello"));
        assert!(matches!(&tokens[1].token_type, TokenType::STRING(s) if s == "multi\nline"));

        // The newline inside the string bumps the line counter.
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn test_scanner_06_unterminated_string() {
        let scanner = Scanner::new(b"\"oops");
        let results: Vec<_> = scanner.collect();

        assert_eq!(results.len(), 2);

        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error: Unterminated string.");

        assert!(matches!(
            results[1].as_ref().unwrap().token_type,
            TokenType::EOF
        ));
    }

    #[test]
    fn test_scanner_07_comments_and_lines() {
        assert_token_sequence(
            "// this is ignored\nprint 1; // so is this",
            &[
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER(0.0), "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );

        let scanner = Scanner::new(b"1\n2\n3");
        let lines: Vec<usize> = scanner.filter_map(Result::ok).map(|t| t.line).collect();

        assert_eq!(lines, vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_scanner_08_unexpected_chars_interleaved() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF.
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );

        fn assert_token_matches(
            result: &Result<lox::token::Token, lox::error::LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_scanner_09_tokenize_display_format() {
        let scanner = Scanner::new(b"var x = 42;");
        let printed: Vec<String> = scanner
            .filter_map(Result::ok)
            .map(|t| t.to_string())
            .collect();

        assert_eq!(
            printed,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 42 42.0",
                "SEMICOLON ; null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_10_number_literal_keeps_decimal() {
        let scanner = Scanner::new(b"1 1.5 1234.1234");
        let printed: Vec<String> = scanner
            .filter_map(Result::ok)
            .map(|t| t.to_string())
            .collect();

        assert_eq!(printed[0], "NUMBER 1 1.0");
        assert_eq!(printed[1], "NUMBER 1.5 1.5");
        assert_eq!(printed[2], "NUMBER 1234.1234 1234.1234");
    }

    #[test]
    fn test_scanner_11_lexeme_rescan_round_trip() {
        let source = "fun add(a, b) { return a + b; } // trailing\nprint add(1.5, 2);";

        let first: Vec<_> = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let rebuilt: String = first
            .iter()
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let second: Vec<_> = Scanner::new(rebuilt.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let first_kinds: Vec<_> = first.iter().map(|t| t.token_type.name()).collect();
        let second_kinds: Vec<_> = second.iter().map(|t| t.token_type.name()).collect();

        assert_eq!(first_kinds, second_kinds);
    }
}
