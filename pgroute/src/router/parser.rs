//! Statements parsed with `pg_query`.

use pg_query::protobuf::{ParseResult, SelectStmt};
use pg_query::NodeEnum;

use super::Error;

/// Parsed statement.
///
/// Plugins read the protobuf in place, so it has to outlive every plugin call
/// made for this statement.
#[derive(Debug, Clone)]
pub struct Ast {
    protobuf: ParseResult,
}

impl Ast {
    /// Parse a query.
    pub fn parse(query: &str) -> Result<Self, Error> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let protobuf = pg_query::parse(query)?.protobuf;
        if protobuf.stmts.is_empty() {
            return Err(Error::EmptyQuery);
        }

        Ok(Self { protobuf })
    }

    pub fn protobuf(&self) -> &ParseResult {
        &self.protobuf
    }

    /// Statements can be sent to a replica.
    ///
    /// Only plain `SELECT`s qualify: no row locks, no `SELECT INTO`
    /// and no data-modifying CTEs.
    pub fn read(&self) -> bool {
        self.protobuf.stmts.iter().all(|stmt| {
            match stmt.stmt.as_ref().and_then(|stmt| stmt.node.as_ref()) {
                Some(NodeEnum::SelectStmt(stmt)) => {
                    stmt.locking_clause.is_empty()
                        && stmt.into_clause.is_none()
                        && !Self::cte_writes(stmt)
                }
                _ => false,
            }
        })
    }

    fn cte_writes(stmt: &SelectStmt) -> bool {
        if let Some(ref with_clause) = stmt.with_clause {
            for cte in &with_clause.ctes {
                if let Some(NodeEnum::CommonTableExpr(expr)) = cte.node.as_ref() {
                    if let Some(ref query) = expr.ctequery {
                        match query.node {
                            Some(NodeEnum::SelectStmt(ref stmt)) => {
                                if Self::cte_writes(stmt) {
                                    return true;
                                }
                            }

                            _ => return true,
                        }
                    }
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read() {
        for query in [
            "SELECT 1",
            "SELECT * FROM users WHERE id = $1",
            "WITH t AS (SELECT 1) SELECT * FROM t",
            "SELECT 1; SELECT 2",
        ] {
            assert!(Ast::parse(query).unwrap().read(), "{}", query);
        }
    }

    #[test]
    fn test_write() {
        for query in [
            "INSERT INTO users (id) VALUES (1)",
            "UPDATE users SET id = 2",
            "DELETE FROM users",
            "SELECT * FROM users FOR UPDATE",
            "SELECT * INTO archive FROM users",
            "WITH t AS (INSERT INTO users (id) VALUES (1) RETURNING *) SELECT * FROM t",
            "WITH a AS (WITH b AS (DELETE FROM users RETURNING *) SELECT * FROM b) SELECT * FROM a",
            "SELECT 1; DELETE FROM users",
            "BEGIN",
        ] {
            assert!(!Ast::parse(query).unwrap().read(), "{}", query);
        }
    }

    #[test]
    fn test_empty() {
        assert!(matches!(Ast::parse(""), Err(Error::EmptyQuery)));
        assert!(matches!(Ast::parse("  \n"), Err(Error::EmptyQuery)));
        assert!(matches!(Ast::parse(";"), Err(Error::EmptyQuery)));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(Ast::parse("SELEKT 1"), Err(Error::PgQuery(_))));
    }
}
