//! Entry points for the routing layer.
//!
//! Each call captures one `now` and uses it for every overdue comparison in
//! that call, so a single response is an internally consistent snapshot.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::filter::{compile, FilterParams};
use crate::models::{to_stored_precision, Defect, DefectItem};
use crate::paginate::{paginate, PageRequest, PageResult};
use crate::policy::{is_visible, scope, Actor};
use crate::sort::resolve;
use crate::stats::{aggregate, Statistics};
use crate::store::DefectStore;

/// Everything a listing request may carry besides the actor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(flatten)]
    pub filters: FilterParams,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub fn list_defects<S: DefectStore + ?Sized>(
    store: &S,
    actor: &Actor,
    query: &ListQuery,
) -> Result<PageResult<DefectItem>> {
    list_defects_at(store, actor, query, Utc::now())
}

pub fn list_defects_at<S: DefectStore + ?Sized>(
    store: &S,
    actor: &Actor,
    query: &ListQuery,
    now: DateTime<Utc>,
) -> Result<PageResult<DefectItem>> {
    let now = to_stored_precision(now);
    // Validate everything before touching the store.
    let filters = compile(&query.filters)?;
    let predicate = scope(actor).and(&filters);
    let sort = resolve(query.sort_by.as_deref(), query.sort_order.as_deref());
    let request = PageRequest::new(query.page, query.per_page);

    debug!(role = %actor.role, user_id = actor.user_id, ?sort, "listing defects");
    paginate(store, &predicate, sort, request, now)
}

pub fn get_statistics<S: DefectStore + ?Sized>(store: &S, actor: &Actor) -> Result<Statistics> {
    get_statistics_at(store, actor, Utc::now())
}

pub fn get_statistics_at<S: DefectStore + ?Sized>(
    store: &S,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Statistics> {
    aggregate(store, actor, to_stored_precision(now))
}

/// Per-record gate for detail, update and delete.
pub fn check_visibility(actor: &Actor, defect: &Defect) -> bool {
    is_visible(actor, defect, to_stored_precision(Utc::now()))
}
