#[cfg(test)]
mod scanner_tests {
    use ember_interpreter as ember;

    use ember::error::LoxError;
    use ember::scanner::*;
    use ember::token::*;
    use pretty_assertions::assert_eq;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens: Vec<_> = Scanner::new(source).filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(result: &Result<Token<'_>, LoxError>, kind: TokenType, lexeme: &str) {
        match result {
            Ok(token) => {
                assert_eq!(token.token_type, kind);
                assert_eq!(token.lexeme, lexeme);
            }
            Err(e) => panic!("expected {:?} '{}', got error: {}", kind, lexeme, e),
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
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "struct def construct println break super _tmp var1",
            &[
                (TokenType::STRUCT, "struct"),
                (TokenType::DEF, "def"),
                (TokenType::IDENTIFIER, "construct"),
                (TokenType::PRINTLN, "println"),
                (TokenType::BREAK, "break"),
                (TokenType::SUPER, "super"),
                (TokenType::IDENTIFIER, "_tmp"),
                (TokenType::IDENTIFIER, "var1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_numbers() {
        let tokens = scan("123 3.14 7.").unwrap();
        let printed: Vec<String> = tokens.iter().map(ToString::to_string).collect();

        // A trailing '.' is not part of the number.
        assert_eq!(
            printed,
            vec![
                "NUMBER 123 123.0",
                "NUMBER 3.14 3.14",
                "NUMBER 7 7.0",
                "DOT . null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_05_strings_span_lines() {
        let tokens = scan("\"one\ntwo\" x").unwrap();

        assert_eq!(tokens[0].to_string(), "STRING \"one\ntwo\" one\ntwo");
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_scanner_06_comments_and_lines() {
        let tokens = scan("a // ignored ( ) \nb\n\n// trailing").unwrap();
        let lines: Vec<(&str, usize)> = tokens.iter().map(|t| (t.lexeme, t.line)).collect();

        assert_eq!(lines, vec![("a", 1), ("b", 2), ("", 4)]);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn test_unexpected_multibyte_character_is_skipped_whole() {
        let results: Vec<_> = Scanner::new("a é b").collect();

        assert_eq!(results.len(), 4);
        assert_token_matches(&results[0], TokenType::IDENTIFIER, "a");
        assert!(results[1].is_err());
        assert_token_matches(&results[2], TokenType::IDENTIFIER, "b");
    }

    #[test]
    fn test_unterminated_string_reports_last_line() {
        let err = scan("var s = \"abc\n\ndef").unwrap_err();

        assert_eq!(err.to_string(), "[line 3] Error: Unterminated string.");
    }

    #[test]
    fn test_scan_collects_every_error() {
        let err = scan("@\n#\nok").unwrap_err();

        assert!(matches!(err, LoxError::Diagnostics(ref errors) if errors.len() == 2));
        assert_eq!(
            err.to_string(),
            "[line 1] Error: Unexpected character: @\n[line 2] Error: Unexpected character: #"
        );
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert_token_matches(&scanner.next().unwrap(), TokenType::EOF, "");
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
