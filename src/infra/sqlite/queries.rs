use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::entities::criteria::Criteria;
use crate::domain::entities::filter::CompareOp;
use crate::domain::entities::view::{ItemId, SortDirection, SortSpec};
use crate::usecase::ports::repo::{PageQuery, StoredDocument};

/// SQL text plus its positional parameters, in order of appearance.
#[derive(Debug, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

fn field_path(field: &str) -> Value {
    Value::Text(format!("$.{field}"))
}

fn json_to_sql(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Integer(i64::from(*flag)),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(int) => Value::Integer(int),
            None => Value::Real(number.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(text) => Value::Text(text.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Renders `criteria` as a two-valued SQL condition: every leaf yields 0 or 1,
/// never NULL, so NOT and NOR also select documents missing the field.
pub fn compile_criteria(criteria: &Criteria) -> SqlFragment {
    let mut fragment = SqlFragment::default();
    push_criteria(criteria, &mut fragment);
    fragment
}

fn push_criteria(criteria: &Criteria, out: &mut SqlFragment) {
    match criteria {
        Criteria::IsNull { field } => {
            out.sql.push_str("(json_extract(body, ?) IS NULL)");
            out.params.push(field_path(field));
        }
        Criteria::Compare { field, op, value } => {
            if value.is_null() {
                if *op == CompareOp::Equal {
                    out.sql.push_str("(json_extract(body, ?) IS NULL)");
                    out.params.push(field_path(field));
                } else {
                    out.sql.push_str("(0)");
                }
                return;
            }
            out.sql.push_str(&format!(
                "COALESCE(json_extract(body, ?) {} ?, 0)",
                op.symbol()
            ));
            out.params.push(field_path(field));
            out.params.push(json_to_sql(value));
        }
        Criteria::Regex {
            field,
            pattern,
            case_insensitive,
        } => {
            out.sql.push_str("(json_extract(body, ?) REGEXP ?)");
            out.params.push(field_path(field));
            let pattern = if *case_insensitive {
                format!("(?i){pattern}")
            } else {
                pattern.clone()
            };
            out.params.push(Value::Text(pattern));
        }
        Criteria::And(parts) => push_group(parts, " AND ", "(1)", out),
        Criteria::Or(parts) => push_group(parts, " OR ", "(0)", out),
        Criteria::Nor(parts) => {
            out.sql.push_str("(NOT ");
            push_group(parts, " OR ", "(0)", out);
            out.sql.push(')');
        }
        Criteria::Not(inner) => {
            out.sql.push_str("(NOT ");
            push_criteria(inner, out);
            out.sql.push(')');
        }
    }
}

fn push_group(parts: &[Criteria], joiner: &str, empty: &str, out: &mut SqlFragment) {
    if parts.is_empty() {
        out.sql.push_str(empty);
        return;
    }
    out.sql.push('(');
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            out.sql.push_str(joiner);
        }
        push_criteria(part, out);
    }
    out.sql.push(')');
}

/// `ORDER BY` clause body; always ends with the id tie-break.
pub fn compile_sort(sort: &SortSpec) -> SqlFragment {
    let mut fragment = SqlFragment::default();
    for key in sort.keys() {
        let direction = match key.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        fragment
            .sql
            .push_str(&format!("json_extract(body, ?) {direction}, "));
        fragment.params.push(field_path(&key.field));
    }
    fragment.sql.push_str("id ASC");
    fragment
}

fn where_clause(collection: &str, criteria: Option<&Criteria>) -> SqlFragment {
    let mut fragment = SqlFragment {
        sql: "collection = ?".to_string(),
        params: vec![Value::Text(collection.to_string())],
    };
    if let Some(criteria) = criteria {
        let compiled = compile_criteria(criteria);
        fragment.sql.push_str(" AND ");
        fragment.sql.push_str(&compiled.sql);
        fragment.params.extend(compiled.params);
    }
    fragment
}

fn parse_id(raw: &str) -> Result<ItemId> {
    raw.parse()
        .with_context(|| format!("stored id is not a valid identifier: {raw}"))
}

pub fn count_documents(
    conn: &Connection,
    collection: &str,
    criteria: Option<&Criteria>,
) -> Result<usize> {
    let filter = where_clause(collection, criteria);
    let count_sql = format!("SELECT COUNT(*) FROM document WHERE {}", filter.sql);
    let total: i64 = conn
        .query_row(
            &count_sql,
            rusqlite::params_from_iter(filter.params),
            |row| row.get(0),
        )
        .context("failed to query filtered document count")?;
    usize::try_from(total).context("document count out of range")
}

fn page_sql(select: &str, collection: &str, query: PageQuery<'_>) -> Result<SqlFragment> {
    let filter = where_clause(collection, query.criteria);
    let order = compile_sort(query.sort);

    let mut params = filter.params;
    params.extend(order.params);
    params.push(Value::Integer(
        i64::try_from(query.limit).context("page limit out of range")?,
    ));
    params.push(Value::Integer(
        i64::try_from(query.skip).context("page offset out of range")?,
    ));

    Ok(SqlFragment {
        sql: format!(
            "SELECT {select} FROM document WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            filter.sql, order.sql
        ),
        params,
    })
}

pub fn fetch_documents(
    conn: &Connection,
    collection: &str,
    query: PageQuery<'_>,
) -> Result<Vec<StoredDocument>> {
    let page = page_sql("id, body", collection, query)?;
    let mut stmt = conn
        .prepare(&page.sql)
        .context("failed to prepare page query")?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(page.params), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .context("failed to query page")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect page")?;

    rows.into_iter()
        .map(|(id, body)| -> Result<StoredDocument> {
            Ok(StoredDocument {
                id: parse_id(&id)?,
                body: serde_json::from_str(&body)
                    .with_context(|| format!("failed to decode document {id}"))?,
            })
        })
        .collect()
}

pub fn fetch_document_ids(
    conn: &Connection,
    collection: &str,
    query: PageQuery<'_>,
) -> Result<Vec<ItemId>> {
    let page = page_sql("id", collection, query)?;
    let mut stmt = conn
        .prepare(&page.sql)
        .context("failed to prepare page id query")?;
    let ids = stmt
        .query_map(rusqlite::params_from_iter(page.params), |row| {
            row.get::<_, String>(0)
        })
        .context("failed to query page ids")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect page ids")?;

    ids.iter().map(|id| parse_id(id)).collect()
}

pub fn fetch_document(
    conn: &Connection,
    collection: &str,
    id: &ItemId,
) -> Result<Option<serde_json::Value>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM document WHERE collection = ?1 AND id = ?2",
            params![collection, id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to load document {id}"))?;

    body.map(|body| {
        serde_json::from_str::<serde_json::Value>(&body)
            .with_context(|| format!("failed to decode document {id}"))
    })
    .transpose()
}

pub fn document_position(
    conn: &Connection,
    collection: &str,
    criteria: Option<&Criteria>,
    sort: &SortSpec,
    id: &ItemId,
) -> Result<Option<usize>> {
    let order = compile_sort(sort);
    let filter = where_clause(collection, criteria);

    // Parameters follow textual order: window ordering comes before WHERE.
    let mut params = order.params;
    params.extend(filter.params);
    params.push(Value::Text(id.to_string()));

    let position_sql = format!(
        "SELECT pos FROM (
             SELECT id, ROW_NUMBER() OVER (ORDER BY {}) - 1 AS pos
             FROM document
             WHERE {}
         ) ranked
         WHERE ranked.id = ?",
        order.sql, filter.sql
    );
    let position: Option<i64> = conn
        .query_row(&position_sql, rusqlite::params_from_iter(params), |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("failed to locate document {id}"))?;

    position
        .map(|pos| usize::try_from(pos).context("document position out of range"))
        .transpose()
}

pub fn document_matches(
    conn: &Connection,
    collection: &str,
    criteria: Option<&Criteria>,
    id: &ItemId,
) -> Result<bool> {
    let filter = where_clause(collection, criteria);
    let mut params = filter.params;
    params.push(Value::Text(id.to_string()));

    let exists_sql = format!(
        "SELECT EXISTS(SELECT 1 FROM document WHERE {} AND id = ?)",
        filter.sql
    );
    conn.query_row(&exists_sql, rusqlite::params_from_iter(params), |row| {
        row.get(0)
    })
    .with_context(|| format!("failed to check membership of document {id}"))
}

pub fn document_exists(conn: &Connection, collection: &str, id: &ItemId) -> Result<bool> {
    document_matches(conn, collection, None, id)
}

pub fn insert_document(
    conn: &Connection,
    collection: &str,
    id: &ItemId,
    body: &serde_json::Value,
) -> Result<()> {
    let body = serde_json::to_string(body)
        .with_context(|| format!("failed to encode document {id}"))?;
    conn.execute(
        "INSERT INTO document(collection, id, body) VALUES (?1, ?2, ?3)",
        params![collection, id.to_string(), body],
    )
    .with_context(|| format!("failed to insert document {id}"))?;
    Ok(())
}

pub fn delete_document(conn: &Connection, collection: &str, id: &ItemId) -> Result<bool> {
    let removed = conn
        .execute(
            "DELETE FROM document WHERE collection = ?1 AND id = ?2",
            params![collection, id.to_string()],
        )
        .with_context(|| format!("failed to delete document {id}"))?;
    Ok(removed > 0)
}
