use super::*;

fn identifier(start: usize, text: &str) -> Identifier {
    Identifier {
        span: Span::new(start, text.len()),
        text: text.to_string(),
    }
}

fn string(start: usize, text: &str) -> Expression {
    Expression::StringLiteral(StringLiteral {
        span: Span::new(start, text.len()),
        text: text.to_string(),
    })
}

fn call_test() -> Expression {
    Expression::FunctionCall(FunctionCall {
        span: Span::new(0, 6),
        identifier: identifier(0, "test"),
        args: vec![],
    })
}

#[test]
fn test_parse_invalid_syntax_tree() {
    let inputs = [
        "[[[reference()]",
        "[[reference()]]",
        "reference()]",
        "reference()",
        "[reference()]foo",
        "",
        "[]",
        "[reference(]",
        "[reference()",
        "[reference() reference()]",
        "[reference().]",
        "[reference()['a']",
    ];

    for input in inputs {
        let result = parse(input);
        assert!(result.is_err(), "parsing should not have succeeded: {input} => {result:?}");
    }
}

#[test]
fn test_parse_syntax_tree_with_all_features() {
    let text = "[reference(resourceId('Microsoft.CustomProviders/resourceProviders/Applications/Components', 'radius', 'app', 'backend')).bindings.web]";

    let expected = SyntaxTree {
        span: Span::new(0, 135),
        expression: Expression::PropertyAccess(PropertyAccess {
            span: Span::new(1, 133),
            accessor: Accessor::Member(identifier(131, "web")),
            base: Box::new(Expression::PropertyAccess(PropertyAccess {
                span: Span::new(1, 129),
                accessor: Accessor::Member(identifier(122, "bindings")),
                base: Box::new(Expression::FunctionCall(FunctionCall {
                    span: Span::new(1, 120),
                    identifier: identifier(1, "reference"),
                    args: vec![Expression::FunctionCall(FunctionCall {
                        span: Span::new(11, 109),
                        identifier: identifier(11, "resourceId"),
                        args: vec![
                            string(
                                22,
                                "'Microsoft.CustomProviders/resourceProviders/Applications/Components'",
                            ),
                            string(93, "'radius'"),
                            string(103, "'app'"),
                            string(110, "'backend'"),
                        ],
                    })],
                })),
            })),
        }),
    };

    assert_eq!(parse(text).unwrap(), expected);
}

#[test]
fn test_parse_empty_string_literal() {
    let tree = parse("['']").unwrap();
    assert_eq!(tree.span, Span::new(0, 4));
    assert_eq!(tree.expression, string(1, "''"));
}

#[test]
fn test_parse_function_call_without_args() {
    let tree = parse("[reference()]").unwrap();
    assert_eq!(tree.span, Span::new(0, 13));
    assert_eq!(
        tree.expression,
        Expression::FunctionCall(FunctionCall {
            span: Span::new(1, 11),
            identifier: identifier(1, "reference"),
            args: vec![],
        })
    );
}

#[test]
fn test_parse_whitespace_around_expression() {
    let tree = parse("[ format( '{0}' , 'a' ) ]").unwrap();
    match tree.expression {
        Expression::FunctionCall(call) => {
            assert_eq!(call.identifier.text, "format");
            assert_eq!(call.args.len(), 2);
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_parse_index_accessor() {
    let tree = parse("[variables('map')['key'][0]]").unwrap();
    assert_eq!(tree.expression.to_string(), "variables('map')['key'][0]");

    match tree.expression {
        Expression::PropertyAccess(outer) => {
            assert_eq!(outer.span, Span::new(1, 26));
            assert!(matches!(
                outer.accessor,
                Accessor::Index(ref index) if matches!(**index, Expression::NumberLiteral(NumberLiteral { value: 0, .. }))
            ));
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_parse_number_arguments() {
    let tree = parse("[createObject('a', 1, 'b', -42)]").unwrap();
    match tree.expression {
        Expression::FunctionCall(call) => {
            assert_eq!(
                call.args[3],
                Expression::NumberLiteral(NumberLiteral {
                    span: Span::new(27, 3),
                    value: -42,
                })
            );
        }
        other => panic!("unexpected expression: {other:?}"),
    }
}

#[test]
fn test_parse_function_call_valid() {
    let cases = [
        ("test ()", 7, vec![]),
        ("test ( )", 8, vec![]),
        ("test ('foo')", 12, vec![string(6, "'foo'")]),
        (
            "test ('foo','bar')",
            18,
            vec![string(6, "'foo'"), string(12, "'bar'")],
        ),
        (
            "test ('foo' ,   'bar')",
            22,
            vec![string(6, "'foo'"), string(16, "'bar'")],
        ),
    ];

    for (text, length, args) in cases {
        // cursor placed after 'test '
        let mut cursor = Cursor::at(text, 5);
        let parsed = parse_function_call(&mut cursor, identifier(0, "test")).unwrap();

        assert_eq!(
            parsed,
            FunctionCall {
                span: Span::new(0, length),
                identifier: identifier(0, "test"),
                args,
            },
            "{text}"
        );
    }
}

#[test]
fn test_parse_function_call_invalid() {
    let inputs = [
        "test (",
        "test )",
        "test (()",
        "test ('foo'",
        "test ('foo',",
        "test ('foo' ,'bar'",
        "test ('foo' ,'bar',)",
    ];

    for input in inputs {
        let mut cursor = Cursor::at(input, 5);
        let result = parse_function_call(&mut cursor, identifier(0, "test"));
        assert!(result.is_err(), "parsing should not have succeeded: {input} => {result:?}");
    }
}

#[test]
fn test_parse_property_access_valid() {
    let cases = [("test() .foo", 11, 8), ("test() .  foo  ", 13, 10)];

    for (text, length, identifier_start) in cases {
        // cursor placed after 'test() '
        let mut cursor = Cursor::at(text, 7);
        let parsed = parse_property_access(&mut cursor, call_test()).unwrap();

        assert_eq!(
            parsed,
            PropertyAccess {
                span: Span::new(0, length),
                base: Box::new(call_test()),
                accessor: Accessor::Member(identifier(identifier_start, "foo")),
            },
            "{text}"
        );
    }
}

#[test]
fn test_parse_property_access_invalid() {
    let inputs = ["foo", ".", "reference()]", "reference()", ".3", "['a'", ""];

    for input in inputs {
        let mut cursor = Cursor::new(input);
        let result = parse_property_access(&mut cursor, call_test());
        assert!(result.is_err(), "parsing should not have succeeded: {input} => {result:?}");
    }
}

#[test]
fn test_parse_identifier_valid() {
    let mut cursor = Cursor::new("foo");
    assert_eq!(parse_identifier(&mut cursor).unwrap(), identifier(0, "foo"));

    let mut cursor = Cursor::new("  foo  ");
    assert_eq!(parse_identifier(&mut cursor).unwrap(), identifier(2, "foo"));

    let mut cursor = Cursor::new("_list2Keys");
    assert_eq!(
        parse_identifier(&mut cursor).unwrap(),
        identifier(0, "_list2Keys")
    );
}

#[test]
fn test_parse_identifier_invalid() {
    for input in ["&foo", "3bar", "    "] {
        let mut cursor = Cursor::new(input);
        let result = parse_identifier(&mut cursor);
        assert!(result.is_err(), "parsing should not have succeeded: {input} => {result:?}");
    }
}

#[test]
fn test_parse_string_literal_valid() {
    for text in ["'foo'", "''", r"'\''", r"'\\'", "'it''s'", "'ünïcödé'"] {
        let mut cursor = Cursor::new(text);
        let parsed = parse_string(&mut cursor).unwrap();
        assert_eq!(
            parsed,
            StringLiteral {
                span: Span::new(0, text.len()),
                text: text.to_string(),
            }
        );
    }
}

#[test]
fn test_parse_string_literal_invalid() {
    for input in ["foo'", "'foo", "'", r"'\'", r"'\", r"'\\\'"] {
        let mut cursor = Cursor::new(input);
        let result = parse_string(&mut cursor);
        assert!(result.is_err(), "parsing should not have succeeded: {input} => {result:?}");
    }
}

#[test]
fn test_unterminated_string_reports_position() {
    let err = parse("[format('abc)]").unwrap_err();
    assert!(matches!(err, ExprError::UnterminatedString { position: 8, .. }));
    assert_eq!(err.position(), Some(8));
}

#[test]
fn test_parse_is_pure() {
    let text = "[format('{0}-{1}', parameters('a'), variables('b').c)]";
    assert_eq!(parse(text).unwrap(), parse(text).unwrap());
}
