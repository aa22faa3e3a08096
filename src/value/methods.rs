//! Builtin methods bound to primitive values.
//!
//! Attribute access on a string, list, map or number that finds no field
//! resolves here, returning a [`Callable`] with the receiver captured, so
//! `brand.lower().startswith('n')` works on plain data.

use crate::expression::{ExpressionError, ExpressionResult};
use crate::value::{Arguments, Callable, Value};
use std::collections::BTreeMap;

/// Resolve `name` as a method of `receiver`
pub fn bound_method(receiver: &Value, name: &str) -> Option<Callable> {
    match receiver {
        Value::String(s) => string_method(s, name),
        Value::List(items) => list_method(items, name),
        Value::Map(map) => map_method(map, name),
        Value::Int(_) | Value::Float(_) => number_method(receiver, name),
        _ => None,
    }
}

fn string_method(receiver: &str, name: &str) -> Option<Callable> {
    let s = receiver.to_string();
    let qualified = format!("str.{}", name);
    let method = match name {
        "lower" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::String(s.to_lowercase()))
        }),
        "upper" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::String(s.to_uppercase()))
        }),
        "strip" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::String(s.trim().to_string()))
        }),
        "len" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::Int(s.chars().count() as i64))
        }),
        "startswith" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 1)?;
            Ok(Value::Boolean(s.starts_with(args.string_at(&qualified, 0)?)))
        }),
        "endswith" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 1)?;
            Ok(Value::Boolean(s.ends_with(args.string_at(&qualified, 0)?)))
        }),
        "contains" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 1)?;
            Ok(Value::Boolean(s.contains(args.string_at(&qualified, 0)?)))
        }),
        "replace" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 2, 2)?;
            let from = args.string_at(&qualified, 0)?;
            let to = args.string_at(&qualified, 1)?;
            Ok(Value::String(s.replace(from, to)))
        }),
        "split" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 1)?;
            let parts: Vec<Value> = match args.get(0) {
                None | Some(Value::Null) => s.split_whitespace().map(Value::from).collect(),
                Some(_) => {
                    let separator = args.string_at(&qualified, 0)?;
                    s.split(separator).map(Value::from).collect()
                }
            };
            Ok(Value::List(parts))
        }),
        _ => return None,
    };
    Some(method)
}

fn list_method(receiver: &[Value], name: &str) -> Option<Callable> {
    let items = receiver.to_vec();
    let qualified = format!("list.{}", name);
    let method = match name {
        "len" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::Int(items.len() as i64))
        }),
        "contains" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 1)?;
            let needle = single(&args);
            Ok(Value::Boolean(items.iter().any(|item| item.equals(&needle))))
        }),
        "index" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 1)?;
            let needle = single(&args);
            items
                .iter()
                .position(|item| item.equals(&needle))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| ExpressionError::KeyNotFound {
                    key: needle.to_string(),
                    container: "list".to_string(),
                })
        }),
        _ => return None,
    };
    Some(method)
}

fn map_method(receiver: &BTreeMap<String, Value>, name: &str) -> Option<Callable> {
    let map = receiver.clone();
    let qualified = format!("map.{}", name);
    let method = match name {
        "len" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::Int(map.len() as i64))
        }),
        "keys" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::List(map.keys().cloned().map(Value::String).collect()))
        }),
        "values" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            Ok(Value::List(map.values().cloned().collect()))
        }),
        "contains" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 1)?;
            let key = args.string_at(&qualified, 0)?;
            Ok(Value::Boolean(map.contains_key(key)))
        }),
        "get" => Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 1, 2)?;
            let key = args.string_at(&qualified, 0)?;
            let default = args.get(1).or_else(|| args.named("default"));
            Ok(map
                .get(key)
                .or(default)
                .cloned()
                .unwrap_or(Value::Null))
        }),
        _ => return None,
    };
    Some(method)
}

fn number_method(receiver: &Value, name: &str) -> Option<Callable> {
    let number = receiver.clone();
    let qualified = format!("{}.{}", receiver.type_name(), name);
    match name {
        "abs" => Some(Callable::new(qualified.clone(), move |args| {
            args.expect_count(&qualified, 0, 0)?;
            match &number {
                Value::Int(i) => i.checked_abs().map(Value::Int).ok_or_else(|| {
                    ExpressionError::Overflow {
                        operator: "abs".to_string(),
                    }
                }),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(ExpressionError::operands("abs", other.type_name(), None)),
            }
        })),
        _ => None,
    }
}

fn single(args: &Arguments) -> Value {
    args.get(0)
        .or_else(|| args.named.first().map(|(_, value)| value))
        .cloned()
        .unwrap_or(Value::Null)
}
