//! Helpers for turning values into Python source
//!
//! Values are built as AST nodes and rendered by the ruff code generator.
//! The generator takes its preferred quote from a [`Stylist`], which is
//! detected from a one-line seed module in that quote style.

use cow_utils::CowUtils;
use ruff_python_ast::{Expr, str::Quote};
use ruff_python_codegen::{Generator, Stylist};
use ruff_python_parser::parse_module;
use serde_json::Value;

use crate::{ast_builder, types::FxIndexMap};

/// Render an expression, preferring `quote` for string literals
pub fn render_expr(expr: &Expr, quote: Quote) -> String {
    let seed = match quote {
        Quote::Single => "''\n",
        Quote::Double => "\"\"\n",
    };
    let parsed = parse_module(seed).expect("quote seed is valid Python");
    let stylist = Stylist::from_tokens(parsed.tokens(), seed);
    Generator::from(&stylist).expr(expr)
}

/// Double-quoted Python string literal
pub fn string_literal(value: &str) -> String {
    render_expr(&ast_builder::string_literal(value, Quote::Double), Quote::Double)
}

/// Single-quoted Python string literal
pub fn single_quoted_literal(value: &str) -> String {
    render_expr(&ast_builder::string_literal(value, Quote::Single), Quote::Single)
}

pub fn int_literal(value: i64) -> String {
    render_expr(&ast_builder::int_literal(i128::from(value)), Quote::Double)
}

/// Python float literal; non-finite values go through `float(...)`
pub fn float_literal(value: f64) -> String {
    render_expr(&ast_builder::float_literal(value, Quote::Double), Quote::Double)
}

/// Expression for an arbitrary JSON value; objects become dicts
pub fn value_to_expr(value: &Value, quote: Quote) -> Expr {
    match value {
        Value::Null => ast_builder::none_literal(),
        Value::Bool(value) => ast_builder::bool_literal(*value),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                ast_builder::int_literal(i128::from(int))
            } else if let Some(int) = number.as_u64() {
                ast_builder::int_literal(i128::from(int))
            } else {
                ast_builder::float_literal(number.as_f64().unwrap_or(f64::NAN), quote)
            }
        }
        Value::String(string) => ast_builder::string_literal(string, quote),
        Value::Array(items) => {
            ast_builder::list(items.iter().map(|item| value_to_expr(item, quote)).collect())
        }
        Value::Object(map) => ast_builder::dict(
            map.iter()
                .map(|(key, value)| {
                    (
                        ast_builder::string_literal(key, quote),
                        value_to_expr(value, quote),
                    )
                })
                .collect(),
        ),
    }
}

/// Render `func(name=value, ...)` on a single line, keywords in order
pub fn keyword_call_to_code(func: &str, params: &FxIndexMap<&str, Value>) -> String {
    let keywords = params
        .iter()
        .map(|(name, value)| ast_builder::keyword(name, value_to_expr(value, Quote::Double)))
        .collect();
    render_expr(
        &ast_builder::call_with_keywords(ast_builder::name(func), Vec::new(), keywords),
        Quote::Double,
    )
}

/// Python list literal of single-quoted string literals
pub fn string_list_literal<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let elts = values
        .into_iter()
        .map(|value| ast_builder::string_literal(value, Quote::Single))
        .collect();
    render_expr(&ast_builder::list(elts), Quote::Single)
}

/// Escape a replacement string for `re.sub`/`Series.replace(regex=True)`,
/// where backslashes introduce group references.
pub fn escape_regex_replacement(value: &str) -> String {
    value.cow_replace("\\", "\\\\").into_owned()
}
