//! Read-only views of the live voice server.
//!
//! Every handler here degrades to `[]` on any query failure.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::http::response::empty_list;
use crate::http::server::AppState;
use crate::query::{GroupEntry, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelNode {
    pub name: String,
    pub cid: u32,
    pub pid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub sgid: u32,
    pub name: String,
    pub icon: i64,
    #[serde(rename = "type")]
    pub kind: u8,
    pub sort: i64,
}

impl From<GroupEntry> for GroupView {
    fn from(group: GroupEntry) -> Self {
        Self {
            sgid: group.id,
            name: group.name,
            icon: group.icon_id,
            kind: group.group_type,
            sort: group.sort_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientHit {
    pub clid: u32,
    pub uniq: String,
    pub dbid: u64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FindParams {
    pub query: Option<String>,
}

fn or_empty<T: Serialize>(endpoint: &str, result: QueryResult<T>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "Voice server query failed, answering with empty list");
            empty_list()
        }
    }
}

pub async fn server_tree(State(state): State<AppState>) -> Response {
    let tree = state.query.channel_list().await.map(|channels| {
        channels
            .into_iter()
            .map(|c| ChannelNode {
                name: c.name,
                cid: c.cid,
                pid: c.pid,
            })
            .collect::<Vec<_>>()
    });
    or_empty("servertree", tree)
}

pub async fn server_groups(State(state): State<AppState>) -> Response {
    let groups = state.query.server_group_list().await.map(|groups| {
        let mut views: Vec<GroupView> = groups.into_iter().map(GroupView::from).collect();
        views.sort_by_key(|g| g.sort);
        views
    });
    or_empty("servergroups", groups)
}

pub async fn channel_groups(State(state): State<AppState>) -> Response {
    let groups = state
        .query
        .channel_group_list()
        .await
        .map(|groups| groups.into_iter().map(GroupView::from).collect::<Vec<_>>());
    or_empty("channelgroups", groups)
}

pub async fn find(State(state): State<AppState>, Query(params): Query<FindParams>) -> Response {
    let Some(pattern) = params.query.filter(|q| !q.is_empty()) else {
        return empty_list();
    };
    or_empty("find", search_clients(&state, &pattern).await)
}

async fn search_clients(state: &AppState, pattern: &str) -> QueryResult<Vec<ClientHit>> {
    let matches = state.query.client_find(pattern).await?;

    let lookups = matches.iter().map(|m| state.query.client_info(m.clid));
    let mut hits = Vec::with_capacity(matches.len());
    for (found, info) in matches.iter().zip(join_all(lookups).await) {
        // Clients that disconnected between find and info are skipped.
        if let Some(info) = info? {
            hits.push(ClientHit {
                clid: found.clid,
                uniq: info.unique_identifier,
                dbid: info.database_id,
                name: info.nickname,
            });
        }
    }
    Ok(hits)
}
