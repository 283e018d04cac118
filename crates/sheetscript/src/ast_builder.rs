//! AST builder module for creating synthetic expression nodes
//!
//! Generated pandas code is assembled from these nodes and rendered with the
//! ruff code generator, so escaping and number formatting follow Python's own
//! rules. All synthetic nodes use default ranges to mark them as generated.

use ruff_python_ast::{
    Arguments, AtomicNodeIndex, DictItem, Expr, ExprBooleanLiteral, ExprCall, ExprContext,
    ExprDict, ExprList, ExprName, ExprNoneLiteral, ExprNumberLiteral, ExprStringLiteral,
    ExprUnaryOp, Identifier, Int, Keyword, Number, StringLiteral, StringLiteralFlags,
    StringLiteralValue, UnaryOp, name::Name, str::Quote,
};
use ruff_text_size::TextRange;

/// Create a synthetic range for generated nodes
fn synthetic_range() -> TextRange {
    TextRange::default()
}

/// Create a string literal expression in the given quote style
pub fn string_literal(value: &str, quote: Quote) -> Expr {
    Expr::StringLiteral(ExprStringLiteral {
        node_index: AtomicNodeIndex::NONE,
        value: StringLiteralValue::single(StringLiteral {
            node_index: AtomicNodeIndex::NONE,
            value: value.into(),
            flags: StringLiteralFlags::empty().with_quote_style(quote),
            range: synthetic_range(),
        }),
        range: synthetic_range(),
    })
}

/// Create an integer literal; negative values become `-<literal>`
pub fn int_literal(value: i128) -> Expr {
    let digits = value.unsigned_abs().to_string();
    let literal = Expr::NumberLiteral(ExprNumberLiteral {
        node_index: AtomicNodeIndex::NONE,
        value: Number::Int(
            digits
                .parse::<Int>()
                .expect("decimal digits always parse as an int"),
        ),
        range: synthetic_range(),
    });
    if value < 0 { negate(literal) } else { literal }
}

/// Create a float literal; NaN and infinities go through `float('...')`
pub fn float_literal(value: f64, quote: Quote) -> Expr {
    if value.is_nan() {
        return call_with_args(name("float"), vec![string_literal("nan", quote)]);
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        return call_with_args(name("float"), vec![string_literal(text, quote)]);
    }
    let literal = Expr::NumberLiteral(ExprNumberLiteral {
        node_index: AtomicNodeIndex::NONE,
        value: Number::Float(value.abs()),
        range: synthetic_range(),
    });
    if value.is_sign_negative() {
        negate(literal)
    } else {
        literal
    }
}

fn negate(operand: Expr) -> Expr {
    Expr::UnaryOp(ExprUnaryOp {
        node_index: AtomicNodeIndex::NONE,
        op: UnaryOp::USub,
        operand: Box::new(operand),
        range: synthetic_range(),
    })
}

/// Create a boolean literal: `True` or `False`
pub fn bool_literal(value: bool) -> Expr {
    Expr::BooleanLiteral(ExprBooleanLiteral {
        node_index: AtomicNodeIndex::NONE,
        value,
        range: synthetic_range(),
    })
}

/// Create `None`
pub fn none_literal() -> Expr {
    Expr::NoneLiteral(ExprNoneLiteral {
        node_index: AtomicNodeIndex::NONE,
        range: synthetic_range(),
    })
}

/// Create a list expression: `[elt1, elt2, ...]`
pub fn list(elts: Vec<Expr>) -> Expr {
    Expr::List(ExprList {
        node_index: AtomicNodeIndex::NONE,
        elts,
        ctx: ExprContext::Load,
        range: synthetic_range(),
    })
}

/// Create a dict expression: `{key1: value1, ...}`
pub fn dict(items: Vec<(Expr, Expr)>) -> Expr {
    Expr::Dict(ExprDict {
        node_index: AtomicNodeIndex::NONE,
        items: items
            .into_iter()
            .map(|(key, value)| DictItem {
                key: Some(key),
                value,
            })
            .collect(),
        range: synthetic_range(),
    })
}

/// Create a name expression: `name`
pub fn name(name: &str) -> Expr {
    Expr::Name(ExprName {
        id: Name::new(name),
        ctx: ExprContext::Load,
        range: synthetic_range(),
        node_index: AtomicNodeIndex::NONE,
    })
}

/// Create a keyword argument: `arg=value`
pub fn keyword(arg: &str, value: Expr) -> Keyword {
    Keyword {
        arg: Some(Identifier::new(arg, synthetic_range())),
        value,
        range: synthetic_range(),
        node_index: AtomicNodeIndex::NONE,
    }
}

/// Create a function call with positional arguments: `func(arg1, arg2, ...)`
pub fn call_with_args(func: Expr, args: Vec<Expr>) -> Expr {
    call_with_keywords(func, args, Vec::new())
}

/// Create a function call: `func(arg1, ..., key1=value1, ...)`
pub fn call_with_keywords(func: Expr, args: Vec<Expr>, keywords: Vec<Keyword>) -> Expr {
    Expr::Call(ExprCall {
        func: Box::new(func),
        arguments: Arguments {
            args: args.into_boxed_slice(),
            keywords: keywords.into(),
            range: synthetic_range(),
            node_index: AtomicNodeIndex::NONE,
        },
        range: synthetic_range(),
        node_index: AtomicNodeIndex::NONE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_keeps_value_and_quote() {
        match string_literal("Sheet 1", Quote::Single) {
            Expr::StringLiteral(literal) => {
                assert_eq!(literal.value.to_str(), "Sheet 1");
            }
            other => panic!("Expected StringLiteral, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_numbers_are_negated_literals() {
        match int_literal(-3) {
            Expr::UnaryOp(unary) => {
                assert_eq!(unary.op, UnaryOp::USub);
                assert!(matches!(*unary.operand, Expr::NumberLiteral(_)));
            }
            other => panic!("Expected UnaryOp, got {other:?}"),
        }
        assert!(matches!(int_literal(3), Expr::NumberLiteral(_)));
        assert!(matches!(float_literal(-0.5, Quote::Double), Expr::UnaryOp(_)));
    }

    #[test]
    fn test_non_finite_floats_are_calls() {
        match float_literal(f64::NAN, Quote::Double) {
            Expr::Call(call) => {
                match &*call.func {
                    Expr::Name(name) => assert_eq!(name.id.as_str(), "float"),
                    other => panic!("Expected Name func, got {other:?}"),
                }
                assert_eq!(call.arguments.args.len(), 1);
            }
            other => panic!("Expected Call, got {other:?}"),
        }
    }

    #[test]
    fn test_call_with_keywords() {
        let expr = call_with_keywords(
            name("get_table_range"),
            Vec::new(),
            vec![keyword("num_columns", int_literal(3))],
        );
        match expr {
            Expr::Call(call) => {
                assert!(call.arguments.args.is_empty());
                assert_eq!(
                    call.arguments.keywords[0].arg.as_ref().unwrap().as_str(),
                    "num_columns"
                );
            }
            other => panic!("Expected Call, got {other:?}"),
        }
    }
}
