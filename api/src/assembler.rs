use serde_json::Value;

use crate::errors::AppError;
use crate::pipeline::{ExecutionMode, ProximityQueryPlan};
use crate::repositories::RecordStore;

/// One facet group: a page of rows and the total across all pages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Facet {
    pub items: Vec<Value>,
    pub total: u64,
}

/// Raw execution outcome. Never leaves this module un-normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// `None` when the store produced no facet group at all.
    Combined(Option<Facet>),
    Separate { items: Vec<Value>, total: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

pub async fn execute(
    store: &dyn RecordStore,
    plan: &ProximityQueryPlan,
) -> Result<ExecutionResult, AppError> {
    match plan.execution_mode {
        ExecutionMode::CombinedFacet => Ok(ExecutionResult::Combined(store.fetch_facet(plan).await?)),
        ExecutionMode::SeparateCount => {
            let count_query = plan.count_query();
            let (items, total) =
                tokio::try_join!(store.fetch_page(plan), store.count(&count_query))?;
            Ok(ExecutionResult::Separate { items, total })
        }
    }
}

pub fn assemble(result: ExecutionResult, page: u64, limit: u64) -> PagedResult {
    let (items, total) = match result {
        ExecutionResult::Combined(facet) => {
            let facet = facet.unwrap_or_default();
            (facet.items, facet.total)
        }
        ExecutionResult::Separate { items, total } => (items, total),
    };
    PagedResult {
        items,
        total,
        page,
        limit,
        pages: page_count(total, limit),
    }
}

/// Execute `plan` and normalize the outcome into one paged shape.
pub async fn run(store: &dyn RecordStore, plan: &ProximityQueryPlan, page: u64) -> Result<PagedResult, AppError> {
    let result = execute(store, plan).await?;
    Ok(assemble(result, page, plan.limit))
}

fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::location::{AnchorMode, LocationAnchor};
    use crate::pipeline::{build_plan, Collection};
    use crate::testing::{mall, MemoryRecordStore};
    use crate::validation::QueryDescriptor;
    use serde_json::json;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn empty_facet_defaults_to_nothing() {
        let paged = assemble(ExecutionResult::Combined(None), 1, 10);
        assert_eq!(paged.items, Vec::<Value>::new());
        assert_eq!(paged.total, 0);
        assert_eq!(paged.pages, 0);
    }

    #[test]
    fn both_shapes_normalize_identically() {
        let items = vec![json!({"id": 1}), json!({"id": 2})];
        let combined = assemble(
            ExecutionResult::Combined(Some(Facet { items: items.clone(), total: 12 })),
            2,
            5,
        );
        let separate = assemble(ExecutionResult::Separate { items, total: 12 }, 2, 5);
        assert_eq!(combined, separate);
        assert_eq!(combined.pages, 3);
    }

    fn store() -> MemoryRecordStore {
        let store = MemoryRecordStore::default();
        store.insert(Collection::Malls, mall(1, "Select Citywalk", 77.219, 28.528, 10, true));
        store.insert(Collection::Malls, mall(2, "DLF Promenade", 77.220, 28.529, 20, true));
        store.insert(Collection::Malls, mall(3, "Ambience Mall", 77.096, 28.505, 30, true));
        store.insert(Collection::Malls, mall(4, "Closed Plaza", 77.219, 28.528, 40, false));
        store.insert(Collection::Malls, mall(5, "Phoenix Marketcity", 72.889, 19.086, 50, true));
        store
    }

    fn plan(mode: ExecutionMode, radius: Option<f64>, page: u64, limit: u64) -> ProximityQueryPlan {
        let anchor = LocationAnchor {
            point: GeoPoint::new(77.2, 28.6).unwrap(),
            mode: AnchorMode::User,
            effective_radius_meters: radius,
        };
        let descriptor = QueryDescriptor {
            page,
            limit,
            radius_meters: radius.unwrap_or(0.0),
            search_text: String::new(),
            skip: (page - 1) * limit,
        };
        build_plan(Collection::Malls, &anchor, &descriptor, mode)
    }

    #[actix_web::test]
    async fn modes_agree_on_total() {
        let store = store();
        for (radius, expected) in [(Some(20_000.0), 3), (None, 4)] {
            let combined = run(&store, &plan(ExecutionMode::CombinedFacet, radius, 1, 2), 1).await.unwrap();
            let separate = run(&store, &plan(ExecutionMode::SeparateCount, radius, 1, 2), 1).await.unwrap();
            assert_eq!(combined.total, expected);
            assert_eq!(combined, separate);
        }
    }

    #[actix_web::test]
    async fn pages_are_stable_and_disjoint() {
        let store = store();
        let first = run(&store, &plan(ExecutionMode::CombinedFacet, None, 1, 2), 1).await.unwrap();
        let again = run(&store, &plan(ExecutionMode::CombinedFacet, None, 1, 2), 1).await.unwrap();
        let second = run(&store, &plan(ExecutionMode::CombinedFacet, None, 2, 2), 2).await.unwrap();
        assert_eq!(first, again);

        let ids: Vec<_> = first.items.iter().chain(&second.items).map(|i| i["id"].clone()).collect();
        // 2 is ~8.1 km, 1 is ~8.2 km, 3 is ~15 km, Mumbai last.
        assert_eq!(ids, vec![json!(2), json!(1), json!(3), json!(5)]);
        assert_eq!(second.pages, 2);
    }

    #[actix_web::test]
    async fn storage_errors_propagate() {
        let store = MemoryRecordStore::failing();
        let err = run(&store, &plan(ExecutionMode::SeparateCount, None, 1, 10), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
