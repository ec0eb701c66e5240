//! In-memory collaborators for unit and route tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use regex::RegexBuilder;
use serde_json::{json, Map, Value};

use crate::assembler::Facet;
use crate::config::fallback_anchor;
use crate::errors::AppError;
use crate::geo::{haversine_distance_meters, GeoPoint};
use crate::pipeline::{Collection, CountQuery, ExecutionMode, ProximityQueryPlan, RecordFilter, SortKey};
use crate::repositories::{
    ManualAddressChanges, ManualAddressRecord, ManualAddressStore, NewManualAddress, Principal,
    PrincipalResolver, RecordStore, Role, UserLocationStore,
};
use crate::state::AppState;

fn unavailable() -> AppError {
    AppError::Database("store unavailable".into())
}

#[derive(Default)]
pub struct MemorySessions {
    tokens: Mutex<HashMap<String, Principal>>,
}

impl MemorySessions {
    pub fn put(&self, token: &str, user_id: i64, role: Role) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), Principal { user_id, role });
    }
}

#[async_trait]
impl PrincipalResolver for MemorySessions {
    async fn verify(&self, token: &str) -> Result<Option<Principal>, AppError> {
        Ok(self.tokens.lock().unwrap().get(token).copied())
    }
}

#[derive(Default)]
pub struct MemoryUserLocationStore {
    locations: Mutex<HashMap<i64, GeoPoint>>,
    failing: bool,
}

impl MemoryUserLocationStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn put(&self, user_id: i64, point: GeoPoint) {
        self.locations.lock().unwrap().insert(user_id, point);
    }

    pub fn get(&self, user_id: i64) -> Option<GeoPoint> {
        self.locations.lock().unwrap().get(&user_id).copied()
    }
}

#[async_trait]
impl UserLocationStore for MemoryUserLocationStore {
    async fn stored_location(&self, user_id: i64) -> Result<Option<GeoPoint>, AppError> {
        if self.failing {
            return Err(unavailable());
        }
        Ok(self.get(user_id))
    }

    async fn set_location(&self, user_id: i64, point: GeoPoint) -> Result<(), AppError> {
        if self.failing {
            return Err(unavailable());
        }
        self.put(user_id, point);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryManualAddressStore {
    records: Mutex<Vec<ManualAddressRecord>>,
    failing: bool,
    all_codes_taken: Mutex<bool>,
    conflicting_inserts: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl MemoryManualAddressStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn put(&self, code: &str, city: &str, location: GeoPoint, is_active: bool) -> i64 {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        records.push(ManualAddressRecord {
            id,
            city: city.to_string(),
            unique_code: code.to_string(),
            state: None,
            country: "India".to_string(),
            location,
            is_active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn reserve_all_codes(&self) {
        *self.all_codes_taken.lock().unwrap() = true;
    }

    /// The next `n` inserts fail as if another writer took the code first.
    pub fn conflict_next_inserts(&self, n: usize) {
        self.conflicting_inserts.store(n, Ordering::SeqCst);
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    fn modify(
        &self,
        id: i64,
        apply: impl FnOnce(&mut ManualAddressRecord),
    ) -> Result<ManualAddressRecord, AppError> {
        if self.failing {
            return Err(unavailable());
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Manual address not found: {id}")))?;
        apply(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl ManualAddressStore for MemoryManualAddressStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<ManualAddressRecord>, AppError> {
        if self.failing {
            return Err(unavailable());
        }
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| r.unique_code == code).cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if *self.all_codes_taken.lock().unwrap() {
            return Ok(true);
        }
        Ok(self.find_by_code(code).await?.is_some())
    }

    async fn insert(&self, code: &str, input: &NewManualAddress) -> Result<ManualAddressRecord, AppError> {
        if self.failing {
            return Err(unavailable());
        }
        let raced = self
            .conflicting_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            return Err(AppError::Conflict(format!("Manual code already taken: {code}")));
        }
        let id = self.put(code, &input.city, input.location, true);
        self.modify(id, |r| {
            r.state = input.state.clone();
            r.country = input.country.clone();
        })
    }

    async fn update(&self, id: i64, changes: &ManualAddressChanges) -> Result<ManualAddressRecord, AppError> {
        self.modify(id, |r| {
            if let Some(city) = &changes.city {
                r.city = city.clone();
            }
            if let Some(state) = &changes.state {
                r.state = Some(state.clone());
            }
            if let Some(country) = &changes.country {
                r.country = country.clone();
            }
            if let Some(location) = changes.location {
                r.location = location;
            }
            if let Some(is_active) = changes.is_active {
                r.is_active = is_active;
            }
        })
    }

    async fn deactivate(&self, id: i64) -> Result<ManualAddressRecord, AppError> {
        self.modify(id, |r| r.is_active = false)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRecord {
    pub fields: Map<String, Value>,
    pub location: GeoPoint,
    pub is_active: bool,
    pub created_at: i64,
}

/// A mall row; `created_at` is seconds since an arbitrary epoch.
pub fn mall(id: i64, name: &str, lng: f64, lat: f64, created_at: i64, is_active: bool) -> MemoryRecord {
    let fields = json!({
        "id": id,
        "name": name,
        "address": format!("{id} Main Road"),
        "city": "Delhi",
        "image_url": null,
        "created_at": created_at,
    });
    MemoryRecord {
        fields: fields.as_object().cloned().unwrap_or_default(),
        location: GeoPoint::new(lng, lat).unwrap(),
        is_active,
        created_at,
    }
}

pub fn banner(id: i64, title: &str, lng: f64, lat: f64, created_at: i64) -> MemoryRecord {
    let fields = json!({
        "id": id,
        "title": title,
        "description": "Festive offers",
        "address": null,
        "image_url": "https://cdn.example.com/b.png",
        "created_at": created_at,
    });
    MemoryRecord {
        fields: fields.as_object().cloned().unwrap_or_default(),
        location: GeoPoint::new(lng, lat).unwrap(),
        is_active: true,
        created_at,
    }
}

/// Evaluates plans the way a geospatial document store would.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<(Collection, MemoryRecord)>>,
    failing: bool,
}

impl MemoryRecordStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, collection: Collection, record: MemoryRecord) {
        self.records.lock().unwrap().push((collection, record));
    }

    fn matching(
        &self,
        collection: Collection,
        anchor: GeoPoint,
        max_distance: Option<f64>,
        filter: &RecordFilter,
    ) -> Result<Vec<(f64, MemoryRecord)>, AppError> {
        if self.failing {
            return Err(unavailable());
        }
        let text = match &filter.text {
            Some(t) => Some((
                RegexBuilder::new(&t.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| AppError::Database(e.to_string()))?,
                t.fields,
            )),
            None => None,
        };

        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, r)| (haversine_distance_meters(anchor, r.location), r.clone()))
            .filter(|(_, r)| !filter.active_only || r.is_active)
            .filter(|(d, _)| max_distance.map_or(true, |max| *d <= max))
            .filter(|(_, r)| match &text {
                Some((re, fields)) => fields.iter().any(|f| {
                    r.fields
                        .get(*f)
                        .and_then(Value::as_str)
                        .is_some_and(|v| re.is_match(v))
                }),
                None => true,
            })
            .collect())
    }

    fn page(&self, plan: &ProximityQueryPlan) -> Result<(Vec<Value>, u64), AppError> {
        let mut rows = self.matching(plan.collection, plan.anchor, plan.max_distance_meters, &plan.filter)?;
        let total = rows.len() as u64;

        rows.sort_by(|(da, a), (db, b)| {
            plan.sort.iter().fold(std::cmp::Ordering::Equal, |acc, key| {
                acc.then_with(|| match key {
                    SortKey::DistanceAsc => da.total_cmp(db),
                    SortKey::CreatedAtDesc => b.created_at.cmp(&a.created_at),
                })
            })
        });

        let items = rows
            .into_iter()
            .skip(plan.skip as usize)
            .take(plan.limit as usize)
            .map(|(distance, r)| {
                let mut out: Map<String, Value> = plan
                    .projection
                    .iter()
                    .filter_map(|f| r.fields.get(*f).map(|v| (f.to_string(), v.clone())))
                    .collect();
                out.insert("lng".into(), json!(r.location.longitude));
                out.insert("lat".into(), json!(r.location.latitude));
                out.insert("distance_meters".into(), json!(distance));
                Value::Object(out)
            })
            .collect();
        Ok((items, total))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_facet(&self, plan: &ProximityQueryPlan) -> Result<Option<Facet>, AppError> {
        let (items, total) = self.page(plan)?;
        // A document-store facet over zero matches yields no group at all.
        Ok((total > 0).then_some(Facet { items, total }))
    }

    async fn fetch_page(&self, plan: &ProximityQueryPlan) -> Result<Vec<Value>, AppError> {
        Ok(self.page(plan)?.0)
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, AppError> {
        let rows = self.matching(query.collection, query.anchor, query.max_distance_meters, &query.filter)?;
        Ok(rows.len() as u64)
    }
}

/// Application state wired to in-memory stores, with handles kept for seeding.
pub struct Fixture {
    pub sessions: Arc<MemorySessions>,
    pub users: Arc<MemoryUserLocationStore>,
    pub addresses: Arc<MemoryManualAddressStore>,
    pub records: Arc<MemoryRecordStore>,
    pub state: AppState,
}

impl Fixture {
    pub fn new(execution_mode: ExecutionMode) -> Self {
        Self::with_records(execution_mode, MemoryRecordStore::default())
    }

    pub fn with_records(execution_mode: ExecutionMode, records: MemoryRecordStore) -> Self {
        let sessions = Arc::new(MemorySessions::default());
        let users = Arc::new(MemoryUserLocationStore::default());
        let addresses = Arc::new(MemoryManualAddressStore::default());
        let records = Arc::new(records);
        let state = AppState {
            principals: sessions.clone(),
            users: users.clone(),
            addresses: addresses.clone(),
            records: records.clone(),
            default_anchor: fallback_anchor(),
            execution_mode,
        };
        Self {
            sessions,
            users,
            addresses,
            records,
            state,
        }
    }
}
