use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::PgPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Column names are checked against `allowed` before they reach the SQL
/// string; unknown keys are rejected.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: uuid::Uuid,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    if let Some(bad) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ErrorBadRequest(format!("Unknown column: {}", bad)));
    }

    // Build SET clause with $1..$n placeholders
    let set_clause = obj
        .keys()
        .enumerate()
        .map(|(i, k)| format!("{} = ${}", k, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        table,
        set_clause,
        id_column,
        obj.len() + 1
    );

    let mut values = Vec::with_capacity(obj.len());

    // Convert JSON values -> SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    pool: &PgPool,
    update: SqlUpdate,
    id_value: uuid::Uuid,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query = query.bind(id_value);

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_positional_placeholders() {
        let payload = json!({"name": "Sick Leave", "default_quota_days": 10});
        let update = build_update_sql(
            "leave_types",
            &payload,
            &["name", "default_quota_days"],
            "id",
            uuid::Uuid::nil(),
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE leave_types SET default_quota_days = $1, name = $2 WHERE id = $3"
        );
        assert_eq!(update.values.len(), 2);
    }

    #[test]
    fn rejects_unknown_columns() {
        let payload = json!({"password": "x"});
        assert!(build_update_sql("users", &payload, &["full_name"], "id", uuid::Uuid::nil()).is_err());
    }

    #[test]
    fn rejects_empty_payloads() {
        let payload = json!({});
        assert!(build_update_sql("users", &payload, &["full_name"], "id", uuid::Uuid::nil()).is_err());
    }

    #[test]
    fn date_strings_become_dates() {
        let payload = json!({"hire_date": "2026-01-01"});
        let update =
            build_update_sql("users", &payload, &["hire_date"], "id", uuid::Uuid::nil()).unwrap();
        assert!(matches!(update.values[0], SqlValue::Date(_)));
    }
}
