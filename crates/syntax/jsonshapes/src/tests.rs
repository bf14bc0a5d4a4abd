//! Tests for the shape grammar.

use super::*;
use rhizome_jsonshapes_ir::{Expr, ExprKind, Statement};
use serde_json::json;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
        .expect("tokenize failed")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn single_expr(source: &str) -> Expr {
    let statements = parse_source(source).expect("parse failed");
    assert_eq!(statements.len(), 1, "source: {}", source);
    match statements.into_iter().next() {
        Some(Statement::Expression(expr)) => expr,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

fn lex_error(source: &str) -> LexErrorKind {
    match tokenize(source) {
        Err(err) => err.reason,
        Ok(tokens) => panic!("expected lex error for {:?}, got {:?}", source, tokens),
    }
}

// Lexer

#[test]
fn test_punctuation_and_words() {
    assert_eq!(
        kinds("a = f(x, [1], {\"k\": true});"),
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Equals,
            TokenKind::Ident("f".into()),
            TokenKind::LParen,
            TokenKind::Ident("x".into()),
            TokenKind::Comma,
            TokenKind::LBracket,
            TokenKind::Number(1i64.into()),
            TokenKind::RBracket,
            TokenKind::Comma,
            TokenKind::LBrace,
            TokenKind::String("k".into()),
            TokenKind::Colon,
            TokenKind::True,
            TokenKind::RBrace,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_numbers() {
    let tokens = tokenize("0 -12 3.25 1e3 -0.5E-2").unwrap();
    let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["0", "-12", "3.25", "1e3", "-0.5E-2", ""]);
    assert_eq!(tokens[1].kind, TokenKind::Number((-12i64).into()));
}

#[test]
fn test_invalid_numbers() {
    assert_eq!(lex_error("01"), LexErrorKind::InvalidNumber("01".into()));
    assert_eq!(lex_error("1."), LexErrorKind::InvalidNumber("1.".into()));
    assert_eq!(lex_error("-"), LexErrorKind::InvalidNumber("-".into()));
    assert_eq!(lex_error("1e"), LexErrorKind::InvalidNumber("1e".into()));
    assert_eq!(lex_error("12abc"), LexErrorKind::InvalidNumber("12abc".into()));
}

#[test]
fn test_string_escapes() {
    let tokens = tokenize(r#""a\"b\\c\né😀""#).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::String("a\"b\\c\né😀".into()));
}

#[test]
fn test_string_errors() {
    assert_eq!(lex_error("\"abc"), LexErrorKind::UnterminatedString);
    assert_eq!(lex_error("\"a\nb\""), LexErrorKind::UnterminatedString);
    assert_eq!(lex_error("\"a\tb\""), LexErrorKind::ControlCharacter);
    assert_eq!(lex_error(r#""\x""#), LexErrorKind::InvalidEscape("x".into()));
    assert!(matches!(
        lex_error(r#""\ud83d""#),
        LexErrorKind::InvalidEscape(_)
    ));
}

#[test]
fn test_stray_characters() {
    assert_eq!(lex_error("a @ b"), LexErrorKind::UnexpectedChar('@'));
    assert_eq!(lex_error("'single'"), LexErrorKind::UnexpectedChar('\''));
    assert_eq!(lex_error("# comment"), LexErrorKind::UnexpectedChar('#'));
}

#[test]
fn test_positions() {
    let err = tokenize("a = 1;\n  b = $").unwrap_err();
    assert_eq!(err.position.line, 2);
    assert_eq!(err.position.column, 7);
    assert_eq!(err.position.offset, 13);
}

// Parser

#[test]
fn test_plain_json_is_a_document() {
    let expr = single_expr(r#"{"name": "x", "tags": [1, 2.5, null, false]}"#);
    assert_eq!(
        expr.to_json(),
        Some(json!({"name": "x", "tags": [1, 2.5, null, false]}))
    );
}

#[test]
fn test_definitions_and_calls() {
    let statements =
        parse_source(r#"node = object({"value": number(), "next": optional(node)});"#).unwrap();
    assert_eq!(statements.len(), 1);
    let Statement::Definition(def) = &statements[0] else {
        panic!("expected definition");
    };
    assert_eq!(def.name, "node");
    assert_eq!(def.body.function(), Some("object"));

    let args = def.body.args().unwrap();
    assert_eq!(args.len(), 1);
    let ExprKind::Object { members } = &args[0].kind else {
        panic!("expected object argument");
    };
    assert_eq!(members[0].0, "value");
    assert_eq!(members[0].1.function(), Some("number"));
    assert_eq!(members[1].0, "next");
    let optional_args = members[1].1.args().unwrap();
    assert_eq!(optional_args[0].reference_name(), Some("node"));
}

#[test]
fn test_keyword_calls() {
    let expr = single_expr("null()");
    assert_eq!(expr.function(), Some("null"));
    assert_eq!(expr.args().map(|a| a.len()), Some(0));

    let expr = single_expr("null");
    assert_eq!(expr.to_json(), Some(json!(null)));

    let expr = single_expr("[true, true()]");
    let ExprKind::Array { items } = &expr.kind else {
        panic!("expected array");
    };
    assert_eq!(items[0].to_json(), Some(json!(true)));
    assert_eq!(items[1].function(), Some("true"));
}

#[test]
fn test_argument_order_preserved() {
    let expr = single_expr(r#"oneOf(string(), number(), constant("x"))"#);
    let names: Vec<_> = expr
        .args()
        .unwrap()
        .iter()
        .map(|a| a.function().unwrap())
        .collect();
    assert_eq!(names, vec!["string", "number", "constant"]);
}

#[test]
fn test_statement_separators() {
    let statements = parse_source(";; a = string();; b = a; list(b)").unwrap();
    let names: Vec<_> = statements.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec![Some("a"), Some("b"), None]);
    assert!(parse_source("").unwrap().is_empty());
}

#[test]
fn test_missing_separator() {
    let err = parse_source("a = string() b = number()").unwrap_err();
    let SyntaxError::Parse(err) = err else {
        panic!("expected parse error");
    };
    assert_eq!(err.expected, "';' or end of input");
    assert_eq!(err.found, "identifier 'b'");
}

#[test]
fn test_trailing_comma_rejected() {
    let err = parse_source("[1, 2,]").unwrap_err();
    assert!(matches!(err, SyntaxError::Parse(ParseError { ref expected, .. }) if expected == "expression"));
}

#[test]
fn test_object_keys_must_be_strings() {
    let err = parse_source("{name: string()}").unwrap_err();
    let SyntaxError::Parse(err) = err else {
        panic!("expected parse error");
    };
    assert_eq!(err.expected, "string key");
}

#[test]
fn test_duplicate_object_keys_rejected() {
    let err = parse_source(r#"{"a": 1, "a": 2}"#).unwrap_err();
    assert!(matches!(err, SyntaxError::Parse(_)));
}

#[test]
fn test_keyword_cannot_be_defined() {
    let err = parse_source("null = string()").unwrap_err();
    let SyntaxError::Parse(err) = err else {
        panic!("expected parse error");
    };
    assert_eq!(err.expected, "definition name");
}

#[test]
fn test_host_reserved_words_rejected() {
    for source in ["class = string()", "def = number()", "function = null()"] {
        let Err(SyntaxError::Parse(err)) = parse_source(source) else {
            panic!("{source} should not parse");
        };
        assert_eq!(err.expected, "definition name");
    }

    let Err(SyntaxError::Parse(err)) = parse_source("a = list(return)") else {
        panic!("reserved reference should not parse");
    };
    assert_eq!(err.found, "reserved word 'return'");

    // shape functions may still be called by a reserved name
    assert!(parse_source("a = not(string())").is_ok());
    assert!(is_reserved("lambda"));
    assert!(!is_reserved("node"));
}

#[test]
fn test_unclosed_call() {
    let err = parse_source("list(string()").unwrap_err();
    let SyntaxError::Parse(err) = err else {
        panic!("expected parse error");
    };
    assert_eq!(err.found, "end of input");
}

#[test]
fn test_nesting_limit() {
    let source = format!("{}1{}", "[".repeat(300), "]".repeat(300));
    assert!(matches!(parse_source(&source), Err(SyntaxError::Parse(_))));

    let source = format!("{}1{}", "[".repeat(100), "]".repeat(100));
    assert!(parse_source(&source).is_ok());
}

#[test]
fn test_positions_on_nodes() {
    let statements = parse_source("a = string();\nb = list(a)").unwrap();
    let Statement::Definition(b) = &statements[1] else {
        panic!("expected definition");
    };
    assert_eq!(b.position.line, 2);
    assert_eq!(b.position.column, 1);
    let arg = &b.body.args().unwrap()[0];
    assert_eq!(arg.position.column, 10);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(json!(null)),
            any::<bool>().prop_map(|b| json!(b)),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _\\-\"\\\\é]{0,12}".prop_map(|s| json!(s)),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn plain_json_parses_to_itself(value in json_value()) {
            let source = serde_json::to_string(&value).unwrap();
            let expr = single_expr(&source);
            prop_assert_eq!(expr.to_json(), Some(value));
        }

        #[test]
        fn parsing_is_deterministic(value in json_value()) {
            let source = format!("a = list({});", serde_json::to_string(&value).unwrap());
            prop_assert_eq!(parse_source(&source).unwrap(), parse_source(&source).unwrap());
        }
    }
}
