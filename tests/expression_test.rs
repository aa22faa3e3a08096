use common_query::expression::{Compiler, Expression, ExpressionError, QueryBuilder as Q};
use common_query::value::{HostObject, Value};

fn compile(expression: &Expression) -> impl Fn(Value) -> Result<Value, ExpressionError> {
    let compiled = Compiler::new().compile(expression);
    move |env| compiled.evaluate(&env)
}

#[derive(Debug)]
struct Person {
    name: String,
}

impl HostObject for Person {
    fn type_name(&self) -> &str {
        "Person"
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.clone())),
            _ => None,
        }
    }
}

#[test]
fn test_reference() {
    let x = compile(&Q::field("x"));
    assert_eq!(x(Value::map([("x", Value::Int(10))])).unwrap(), Value::Int(10));

    let indirect = compile(&Q::reference(Q::field("x")));
    let env = Value::map([("x", Value::from("y")), ("y", Value::Int(10))]);
    assert_eq!(indirect(env).unwrap(), Value::Int(10));
}

#[test]
fn test_get_attr() {
    let name = compile(&Q::field("person").attr("name"));
    let env = Value::map([(
        "person",
        Value::object(Person {
            name: "Johnny".to_string(),
        }),
    )]);
    assert_eq!(name(env).unwrap(), Value::from("Johnny"));
}

#[test]
fn test_call() {
    let jane = compile(&Q::field("name").attr("startswith").call(["Jane"]));
    assert_eq!(
        jane(Value::map([("name", Value::from("Jane Doe"))])).unwrap(),
        Value::Boolean(true)
    );

    let prefix = compile(&Q::field("last_name").attr("startswith").call([Q::field("first_name")]));
    let env = Value::map([
        ("first_name", Value::from("John")),
        ("last_name", Value::from("Johnson")),
    ]);
    assert_eq!(prefix(env).unwrap(), Value::Boolean(true));
}

#[test]
fn test_get_item() {
    let first = compile(&Q::field("users").item(0));
    let env = Value::map([("users", Value::list([Value::from("Jane")]))]);
    assert_eq!(first(env).unwrap(), Value::from("Jane"));

    let indexed = compile(&Q::field("users").item(Q::field("index")));
    let env = Value::map([
        ("users", Value::list([Value::from("Jane"), Value::from("John")])),
        ("index", Value::Int(1)),
    ]);
    assert_eq!(indexed(env).unwrap(), Value::from("John"));
}

#[test]
fn test_boolean_operation() {
    let between = compile(&Q::lt(Q::lt(Q::field("x"), 10), Q::field("y")));
    let env = Value::map([("x", Value::Int(5)), ("y", Value::Int(15))]);
    assert_eq!(between(env).unwrap(), Value::Boolean(true));
}

#[test]
fn test_arithmetic_operation() {
    let plus_five = compile(&Q::add(Q::field("x"), 5));
    assert_eq!(
        plus_five(Value::map([("x", Value::Int(5))])).unwrap(),
        Value::Int(10)
    );
}

#[test]
fn test_unary_operation() {
    let inverted = compile(&Q::not(Q::field("x")));
    assert_eq!(
        inverted(Value::map([("x", Value::Boolean(false))])).unwrap(),
        Value::Boolean(true)
    );

    let negated = compile(&Q::neg(Q::field("x")));
    assert_eq!(
        negated(Value::map([("x", Value::Int(10))])).unwrap(),
        Value::Int(-10)
    );
}

#[test]
fn test_raw_literal_is_returned_unevaluated() {
    let raw = compile(&Q::raw(Q::field("users")));
    let result = raw(Value::Null).unwrap();
    assert_eq!(result.as_expression(), Some(&Q::field("users")));
}

#[test]
fn test_functional_sublanguage() {
    // Bind a threshold, then keep the scores above it
    let above = Q::for_each(
        Q::field("scores"),
        Q::function(
            "s",
            Q::if_else(Q::gt(Q::field("s"), Q::field("threshold")), Q::field("s"), Q::null()),
        ),
    );
    let with_threshold = compile(&Q::assign("threshold", 50));
    let env = with_threshold(Value::map([(
        "scores",
        Value::list([Value::Int(10), Value::Int(70), Value::Int(90)]),
    )]))
    .unwrap();

    let result = compile(&above)(env).unwrap();
    assert_eq!(
        result.to_json().unwrap(),
        serde_json::json!([null, 70, 90])
    );
}

#[test]
fn test_evaluation_errors() {
    let missing = compile(&Q::field("missing"));
    assert!(missing(Value::map([("x", Value::Int(1))])).unwrap_err().is_lookup());

    let mismatched = compile(&Q::add(Q::field("x"), "a"));
    assert!(mismatched(Value::map([("x", Value::Int(1))]))
        .unwrap_err()
        .is_type_error());
}
