//! Source tables of a query.
//!
//! SQLite only reports a declared column type to sqlx when it maps onto one
//! of sqlx's own types, so `DECIMAL(9,2)` arrives untyped and `CLOB` as
//! `TEXT`. The tables a query reads from are found here so their declared
//! types can be looked up in the catalog.

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Returns the tables named in the FROM clauses of every query in `sql`,
/// in order of appearance and without duplicates.
///
/// Text that does not parse yields no tables.
pub(crate) fn source_tables(sql: &str) -> Vec<String> {
    let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!("Could not parse statement for source tables: {}", e);
            return Vec::new();
        }
    };

    let mut tables = Vec::new();
    for statement in &statements {
        if let Statement::Query(query) = statement {
            collect_query(query, &mut tables);
        }
    }
    tables
}

fn collect_query(query: &Query, tables: &mut Vec<String>) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collect_query(&cte.query, tables);
        }
    }
    collect_set_expr(&query.body, tables);
}

fn collect_set_expr(set_expr: &SetExpr, tables: &mut Vec<String>) {
    match set_expr {
        SetExpr::Select(select) => {
            for table_with_joins in &select.from {
                collect_table_with_joins(table_with_joins, tables);
            }
        }
        SetExpr::Query(query) => collect_query(query, tables),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, tables);
            collect_set_expr(right, tables);
        }
        _ => {}
    }
}

fn collect_table_with_joins(twj: &TableWithJoins, tables: &mut Vec<String>) {
    collect_table_factor(&twj.relation, tables);
    for join in &twj.joins {
        collect_table_factor(&join.relation, tables);
    }
}

fn collect_table_factor(factor: &TableFactor, tables: &mut Vec<String>) {
    match factor {
        TableFactor::Table { name, .. } => {
            // Schema qualifiers are dropped; pragma_table_info searches all schemas.
            if let Some(ident) = name.0.last() {
                if !tables.contains(&ident.value) {
                    tables.push(ident.value.clone());
                }
            }
        }
        TableFactor::Derived { subquery, .. } => collect_query(subquery, tables),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => collect_table_with_joins(table_with_joins, tables),
        _ => {}
    }
}
