//! # Artificer Tour
//!
//! Compiles a handful of queries against in-memory collaborators and prints
//! what each backend would run:
//! 1. Registering an ontology and indexing some text.
//! 2. Building query ASTs.
//! 3. Printing the plan, the SQL and the JCR-SQL2 for each.

use std::sync::Arc;

use artificer::query::ast::{
    Argument, EqualityOperator, Expr, FunctionCall, LocationPath, PrimaryExpr, Query,
    SubartifactSet,
};
use artificer::{
    Config, MemoryClassifications, MemoryFullTextIndex, Ontology, OrderBy, QueryEngine, Result,
};

fn main() -> Result<()> {
    // 1. Collaborators
    let regions = MemoryClassifications::new().with_ontology(
        Ontology::new("http://example.org/regions.owl")
            .with_class("World", None)
            .with_class("Asia", Some("World"))
            .with_class("China", Some("Asia")),
    );
    let index = MemoryFullTextIndex::new();
    index.index("9f1c", "name", "AccountService.wsdl");
    index.index("4b2e", "description", "shared account types");

    let engine = QueryEngine::new(Arc::new(regions), Arc::new(index), Config::default());

    // 2. Queries
    let queries = vec![
        (
            "typed, with a custom property",
            Query::new(LocationPath::typed("xsd", "XsdDocument"))
                .with_predicate(Expr::equals("name", "account.xsd").and(Expr::exists("owner"))),
        ),
        (
            "relationship predicate",
            Query::new(LocationPath::typed("wsdl", "WsdlDocument")).with_predicate(Expr::subartifacts(
                SubartifactSet::relationship("importedXsds")
                    .with_predicate(Expr::compare("contentSize", EqualityOperator::Gt, PrimaryExpr::Number(1024.0))),
            )),
        ),
        (
            "classification",
            Query::new(LocationPath::all()).with_predicate(Expr::function(FunctionCall::sramp(
                "classifiedByAnyOf",
                vec![Argument::context(), Argument::literal("Asia")],
            ))),
        ),
        (
            "full text",
            Query::new(LocationPath::all()).with_predicate(Expr::function(FunctionCall::xpath(
                "matches",
                vec![Argument::context(), Argument::literal(".*account.*")],
            ))),
        ),
    ];

    // 3. Compile
    let order = OrderBy::ascending("name");
    for (title, query) in &queries {
        println!("== {title}: {query}");
        println!("{}", engine.explain(query)?);
        let sql = engine.compile_relational(query, Some(&order))?;
        println!("SQL:   {}  {:?}", sql.sql, sql.params);
        let sql2 = engine.compile_hierarchical(query, Some(&order))?;
        println!("SQL2:  {}\n", sql2.statement);
    }

    Ok(())
}
