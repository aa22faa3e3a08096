//! Example demonstrating repository pipelines over JSON entities

use common_query::expression::QueryBuilder as Q;
use common_query::repository::{QueryError, Repository};
use common_query::value::Value;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Repository Pipeline Demo");
    println!("========================");

    let entities = match Value::from(json!([
        {"brand": "PUMA", "group": 4, "founded": 1948},
        {"brand": "Nike", "group": 4, "founded": 1964},
        {"brand": "adidas", "group": 3, "founded": 1949},
        {"brand": "Uhlsport", "group": 3, "founded": 1948},
        {"brand": "New Balance", "group": 3, "founded": 1906},
    ])) {
        Value::List(items) => items,
        _ => Vec::new(),
    };
    let brands = Repository::from_entities(entities);

    // Filter
    let starts_with_n = brands.filter(Q::starts_with(Q::lower(Q::field("brand")), "n"));
    println!("\n{:?}", starts_with_n);
    for brand in starts_with_n.values_list(["brand"], true)?.iter()? {
        println!("  {}", brand);
    }

    // Multi-key ordering
    let ordered = brands.order_by([Q::descending(Q::field("group")), Q::lower(Q::field("brand"))]);
    println!("\n{:?}", ordered);
    for row in ordered.values_list(["group", "brand"], false)?.iter()? {
        println!("  {}", row);
    }

    // Projection and pagination
    let page = ordered.offset(1).limit(2).values(["brand", "founded"])?;
    println!("\n{:?}", page);
    println!("  {}", serde_json::to_string(&page.materialize()?)?);

    // Single-entity retrieval
    println!("\nget:");
    for query in [
        Q::field_equals("brand", "Nike"),
        Q::field_equals("brand", "Asics"),
        Q::lt(Q::field("founded"), 1950),
    ] {
        match brands.get(query) {
            Ok(entity) => println!("  found {}", entity),
            Err(err @ (QueryError::NotFound { .. } | QueryError::NotUnique { .. })) => {
                println!("  {}", err)
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!(
        "\n{} of {} brands were founded before 1950",
        brands.filter(Q::lt(Q::field("founded"), 1950)).count()?,
        brands.count()?
    );

    Ok(())
}
