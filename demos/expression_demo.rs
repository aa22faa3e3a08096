//! Example demonstrating expression building and compilation

use common_query::expression::{Compiler, Expression, QueryBuilder as Q};
use common_query::value::{Arguments, Value};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Expression Compilation Demo");
    println!("===========================");

    let compiler = Compiler::new();
    let env = Value::map([
        ("x", Value::Int(5)),
        ("y", Value::Int(15)),
        ("name", Value::from("Jane Doe")),
        (
            "users",
            Value::list([Value::from("Jane"), Value::from("John")]),
        ),
    ]);
    println!("Environment: {}", env);

    // Example 1: Chained comparison
    println!("\n1. Chained Comparison");
    println!("---------------------");
    let between = Expression::field("x").lt(10).lt(Expression::field("y"));
    println!("{} => {}", between, compiler.compile(&between).evaluate(&env)?);

    // Example 2: Arithmetic with folded literals
    println!("\n2. Arithmetic");
    println!("-------------");
    let sum = Q::add(Q::add(Q::int(1), Q::int(2)), Q::field("x"));
    println!("{} => {}", sum, compiler.compile(&sum).evaluate(&env)?);
    let ratio = Q::div(Q::field("y"), Q::field("x"));
    println!("{} => {}", ratio, compiler.compile(&ratio).evaluate(&env)?);

    // Example 3: Method calls and subscripts
    println!("\n3. Methods and Subscripts");
    println!("-------------------------");
    let jane = Q::starts_with(Q::field("name"), "Jane");
    println!("{} => {}", jane, compiler.compile(&jane).evaluate(&env)?);
    let last_user = Q::item(Q::field("users"), -1);
    println!("{} => {}", last_user, compiler.compile(&last_user).evaluate(&env)?);

    // Example 4: Negation rewrites comparisons
    println!("\n4. Negation");
    println!("-----------");
    let small = Q::lt(Q::field("x"), 10);
    println!("not({}) => {}", small, Q::not(small.clone()));

    // Example 5: Functions, iteration and conditionals
    println!("\n5. Functional Expressions");
    println!("-------------------------");
    let greet = Q::function(
        "who",
        Q::if_else(
            Q::eq(Q::field("who"), "John"),
            Q::string("hey John"),
            Q::add(Q::string("hello "), Q::field("who")),
        ),
    );
    let greetings = Q::for_each(Q::field("users"), greet.clone());
    println!("{} => {}", greetings, compiler.compile(&greetings).evaluate(&env)?.to_json()?);

    let greet_fn = compiler.compile(&greet).evaluate(&env)?;
    let greeting = greet_fn.call(Arguments::positional(vec![Value::from("Ann")]))?;
    println!("{}('Ann') => {}", greet_fn, greeting);

    // Example 6: Errors surface at evaluation
    println!("\n6. Evaluation Errors");
    println!("--------------------");
    for expr in [Q::field("missing"), Q::add(Q::field("x"), Q::field("name"))] {
        match compiler.compile(&expr).evaluate(&env) {
            Ok(value) => println!("{} => {}", expr, value),
            Err(err) => println!("{} => error: {}", expr, err),
        }
    }

    Ok(())
}
