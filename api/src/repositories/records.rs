use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::Value;
use tokio_postgres::types::ToSql;

use super::RecordStore;
use crate::assembler::Facet;
use crate::errors::AppError;
use crate::geo::GeoPoint;
use crate::pipeline::{CountQuery, ProximityQueryPlan, RecordFilter, SortKey};

type Param = Box<dyn ToSql + Sync + Send>;

/// SQL text plus its positional parameters.
struct CompiledQuery {
    sql: String,
    params: Vec<Param>,
}

impl CompiledQuery {
    fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Accumulates parameters; the anchor pair is bound once, on first use.
struct Binder {
    params: Vec<Param>,
    anchor: GeoPoint,
    anchor_sql: Option<String>,
}

impl Binder {
    fn new(anchor: GeoPoint) -> Self {
        Self {
            params: Vec::new(),
            anchor,
            anchor_sql: None,
        }
    }

    fn bind(&mut self, value: Param) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn anchor(&mut self) -> String {
        if let Some(sql) = &self.anchor_sql {
            return sql.clone();
        }
        let lng = self.bind(Box::new(self.anchor.longitude));
        let lat = self.bind(Box::new(self.anchor.latitude));
        let sql = format!("ST_SetSRID(ST_MakePoint({lng}, {lat}), 4326)::geography");
        self.anchor_sql = Some(sql.clone());
        sql
    }

    /// Binds a window bound as BIGINT.
    fn bind_bigint(&mut self, name: &str, value: u64) -> Result<String, AppError> {
        let value = i64::try_from(value)
            .map_err(|_| AppError::Validation(format!("{name} {value} exceeds the supported range")))?;
        Ok(self.bind(Box::new(value)))
    }

    fn finish(self, sql: String) -> CompiledQuery {
        CompiledQuery {
            sql,
            params: self.params,
        }
    }
}

fn where_clause(binder: &mut Binder, filter: &RecordFilter, max_distance: Option<f64>) -> String {
    let mut clauses = Vec::new();
    if filter.active_only {
        clauses.push("is_active".to_string());
    }
    if let Some(text) = &filter.text {
        let pattern = binder.bind(Box::new(text.pattern.clone()));
        let any_field = text
            .fields
            .iter()
            .map(|field| format!("{field} ~* {pattern}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        clauses.push(format!("({any_field})"));
    }
    if let Some(meters) = max_distance {
        let anchor = binder.anchor();
        let meters = binder.bind(Box::new(meters));
        clauses.push(format!("ST_DWithin(location::geography, {anchor}, {meters})"));
    }

    if clauses.is_empty() {
        "TRUE".to_string()
    } else {
        clauses.join(" AND ")
    }
}

fn order_by(sort: &[SortKey]) -> String {
    sort.iter()
        .map(|key| match key {
            SortKey::DistanceAsc => "distance_meters ASC",
            SortKey::CreatedAtDesc => "created_at DESC",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Projected columns plus coordinates and distance from the anchor.
fn matched_select(binder: &mut Binder, plan: &ProximityQueryPlan) -> String {
    let predicate = where_clause(binder, &plan.filter, plan.max_distance_meters);
    let anchor = binder.anchor();
    format!(
        "SELECT {columns}, ST_X(location) AS lng, ST_Y(location) AS lat, \
         ST_Distance(location::geography, {anchor}) AS distance_meters \
         FROM {table} WHERE {predicate}",
        columns = plan.projection.join(", "),
        table = plan.collection.table(),
    )
}

fn compile_facet(plan: &ProximityQueryPlan) -> Result<CompiledQuery, AppError> {
    let mut binder = Binder::new(plan.anchor);
    let matched = matched_select(&mut binder, plan);
    let order = order_by(&plan.sort);
    let offset = binder.bind_bigint("offset", plan.skip)?;
    let limit = binder.bind_bigint("limit", plan.limit)?;

    let sql = format!(
        "WITH matched AS ({matched}), \
         page AS (SELECT * FROM matched ORDER BY {order} OFFSET {offset} LIMIT {limit}) \
         SELECT (SELECT COUNT(*) FROM matched) AS total, \
                (SELECT json_agg(to_jsonb(page) ORDER BY {order}) FROM page) AS items"
    );
    Ok(binder.finish(sql))
}

fn compile_page(plan: &ProximityQueryPlan) -> Result<CompiledQuery, AppError> {
    let mut binder = Binder::new(plan.anchor);
    let matched = matched_select(&mut binder, plan);
    let order = order_by(&plan.sort);
    let offset = binder.bind_bigint("offset", plan.skip)?;
    let limit = binder.bind_bigint("limit", plan.limit)?;

    let sql = format!(
        "SELECT to_jsonb(page) FROM ({matched} ORDER BY {order} OFFSET {offset} LIMIT {limit}) page \
         ORDER BY {order}"
    );
    Ok(binder.finish(sql))
}

fn compile_count(query: &CountQuery) -> CompiledQuery {
    let mut binder = Binder::new(query.anchor);
    let predicate = where_clause(&mut binder, &query.filter, query.max_distance_meters);
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE {predicate}",
        table = query.collection.table()
    );
    binder.finish(sql)
}

fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// PostGIS-backed record store for every searchable collection.
pub(crate) struct PgRecordRepository {
    pool: Pool,
}

impl PgRecordRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordRepository {
    async fn fetch_facet(&self, plan: &ProximityQueryPlan) -> Result<Option<Facet>, AppError> {
        let query = compile_facet(plan)?;
        let client = self.pool.get().await?;
        let row = client.query_opt(&query.sql, &query.param_refs()).await?;

        Ok(row.map(|r| {
            let items = match r.get::<_, Option<Value>>(1) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            Facet {
                items,
                total: to_total(r.get(0)),
            }
        }))
    }

    async fn fetch_page(&self, plan: &ProximityQueryPlan) -> Result<Vec<Value>, AppError> {
        let query = compile_page(plan)?;
        let client = self.pool.get().await?;
        let rows = client.query(&query.sql, &query.param_refs()).await?;
        Ok(rows.iter().map(|r| r.get::<_, Value>(0)).collect())
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, AppError> {
        let compiled = compile_count(query);
        let client = self.pool.get().await?;
        let row = client.query_one(&compiled.sql, &compiled.param_refs()).await?;
        Ok(to_total(row.get(0)))
    }
}
