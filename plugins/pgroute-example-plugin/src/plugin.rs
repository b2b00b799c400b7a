use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use pgroute_plugin::pg_query::{
    NodeEnum,
    protobuf::{Node, RangeVar},
};
use pgroute_plugin::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("empty query")]
    EmptyQuery,

    #[error("statement parsed by an unsupported pg_query version: {0}")]
    UnsupportedVersion(i32),
}

static WRITE_TIMES: Lazy<Mutex<HashMap<String, Instant>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn written(relname: &str) {
    WRITE_TIMES.lock().insert(relname.to_owned(), Instant::now());
}

/// Route query to a replica or a primary, depending on when was the last time
/// we wrote to the table.
pub(crate) fn route_query(context: Context) -> Result<Route, PluginError> {
    // The host really thinks this should be a write.
    // This could be because there is an INSERT statement in a CTE,
    // or something else. You could override its decision here, but make
    // sure you checked the AST first.
    let write_override = context.write_override();

    let statement = context.statement();
    let proto = statement
        .protobuf()
        .ok_or(PluginError::UnsupportedVersion(statement.version()))?;
    let root = proto.root().ok_or(PluginError::EmptyQuery)?;

    match root {
        NodeEnum::SelectStmt(stmt) => {
            let shard = if context.sharded() {
                sharding_key(stmt.where_clause.as_deref(), &context)
                    .map(|id| Shard::Direct(id.rem_euclid(context.shards() as i64) as usize))
                    .unwrap_or(Shard::Unknown)
            } else {
                Shard::Unknown
            };

            if write_override {
                return Ok(Route::new(shard, ReadWrite::Unknown));
            }

            let table_name = stmt
                .from_clause
                .first()
                .ok_or(PluginError::EmptyQuery)?
                .node
                .as_ref()
                .ok_or(PluginError::EmptyQuery)?;

            if let NodeEnum::RangeVar(RangeVar { relname, .. }) = table_name {
                // Got info on last write.
                let last_write = { WRITE_TIMES.lock().get(relname).cloned() };
                if let Some(last_write) = last_write
                    && last_write.elapsed() > Duration::from_secs(5)
                    && context.has_replicas()
                {
                    return Ok(Route::new(shard, ReadWrite::Read));
                }

                // Don't have it, assume we're good.
                if last_write.is_none() && context.has_replicas() {
                    return Ok(Route::new(shard, ReadWrite::Read));
                }
            }

            return Ok(Route::new(shard, ReadWrite::Unknown));
        }
        NodeEnum::InsertStmt(stmt) => {
            if let Some(ref relation) = stmt.relation {
                written(&relation.relname);
            }
        }
        NodeEnum::UpdateStmt(stmt) => {
            if let Some(ref relation) = stmt.relation {
                written(&relation.relname);
            }
        }
        NodeEnum::DeleteStmt(stmt) => {
            if let Some(ref relation) = stmt.relation {
                written(&relation.relname);
            }
        }
        _ => {}
    }

    // Let the host decide.
    Ok(Route::unknown())
}

/// Value of `id` in `WHERE id = $n`, read from the bound parameters.
fn sharding_key(where_clause: Option<&Node>, context: &Context) -> Option<i64> {
    let NodeEnum::AExpr(expr) = where_clause?.node.as_ref()? else {
        return None;
    };

    let NodeEnum::ColumnRef(column) = expr.lexpr.as_ref()?.node.as_ref()? else {
        return None;
    };
    let NodeEnum::String(name) = column.fields.last()?.node.as_ref()? else {
        return None;
    };
    if name.sval != "id" {
        return None;
    }

    let NodeEnum::ParamRef(param) = expr.rexpr.as_ref()?.node.as_ref()? else {
        return None;
    };
    let index = usize::try_from(param.number).ok()?.checked_sub(1)?;

    let params = context.parameters();
    match params.get(index)?.decode(params.parameter_format(index))? {
        ParameterValue::Text(text) => text.parse().ok(),
        ParameterValue::Binary(binary) => Some(i64::from_be_bytes(binary.try_into().ok()?)),
    }
}

#[cfg(test)]
mod test {
    use std::os::raw::c_void;

    use pgroute_plugin::{PrParameter, PrParameters, PrRouterContext, PrStatement};

    use super::*;

    fn context(proto: &pg_query::protobuf::ParseResult, shards: u64) -> PrRouterContext {
        PrRouterContext {
            shards,
            has_replicas: 1,
            has_primary: 1,
            in_transaction: 0,
            write_override: 0,
            query: unsafe { PrStatement::from_proto(proto) },
            params: PrParameters::default(),
        }
    }

    #[test]
    fn test_routing_plugin() {
        // Keep protobuf in memory.
        let proto = pg_query::parse("SELECT * FROM users").unwrap().protobuf;
        let route = route_query(context(&proto, 1).into()).unwrap();

        assert_eq!(route.read_write(), Ok(ReadWrite::Read));
        assert_eq!(route.shard(), Ok(Shard::Unknown));
    }

    #[test]
    fn test_recent_write() {
        let insert = pg_query::parse("INSERT INTO orders (id) VALUES (1)")
            .unwrap()
            .protobuf;
        let route = route_query(context(&insert, 1).into()).unwrap();
        assert_eq!(route.read_write(), Ok(ReadWrite::Unknown));

        let select = pg_query::parse("SELECT * FROM orders").unwrap().protobuf;
        let route = route_query(context(&select, 1).into()).unwrap();
        assert_eq!(route.read_write(), Ok(ReadWrite::Unknown));
    }

    #[test]
    fn test_sharding_key() {
        let proto = pg_query::parse("SELECT * FROM accounts WHERE id = $1")
            .unwrap()
            .protobuf;

        let text = b"14";
        let mut params = [PrParameter {
            len: text.len() as i32,
            data: text.as_ptr() as *mut c_void,
        }];
        let mut ffi = context(&proto, 4);
        ffi.params = PrParameters {
            num_params: 1,
            params: params.as_mut_ptr(),
            num_format_codes: 0,
            format_codes: std::ptr::null_mut(),
        };

        let route = route_query(ffi.into()).unwrap();
        assert_eq!(route.shard(), Ok(Shard::Direct(2)));
        assert_eq!(route.read_write(), Ok(ReadWrite::Read));

        let binary = 7_i64.to_be_bytes();
        params[0] = PrParameter {
            len: binary.len() as i32,
            data: binary.as_ptr() as *mut c_void,
        };
        let mut codes = [1_i16];
        ffi.params.format_codes = codes.as_mut_ptr();
        ffi.params.num_format_codes = 1;

        let route = route_query(ffi.into()).unwrap();
        assert_eq!(route.shard(), Ok(Shard::Direct(3)));
    }

    #[test]
    fn test_unsupported_version() {
        let proto = pg_query::parse("SELECT 1").unwrap().protobuf;
        let mut ffi = context(&proto, 1);
        ffi.query.version = -7;

        assert!(matches!(
            route_query(ffi.into()),
            Err(PluginError::UnsupportedVersion(-7))
        ));
    }
}
