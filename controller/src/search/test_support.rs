use std::collections::VecDeque;
use std::time::Duration;

use common::search_query::{Query, QueryDocument};
use common::search_result::ResultDocument;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::json;
use tokio::sync::Mutex;

use crate::db_utils::elastic_utils::SearchExecutor;

/// Replays queued outcomes in order and records every query it was given.
#[derive(Default)]
pub struct CannedExecutor {
    outcomes: Mutex<VecDeque<(Duration, anyhow::Result<ResultDocument>)>>,
    pub calls: Mutex<Vec<(QueryDocument, String)>>,
}

impl CannedExecutor {
    pub async fn push_ok(&self, response: ResultDocument) {
        self.push_delayed(Duration::ZERO, Ok(response)).await;
    }

    pub async fn push_err(&self, message: &str) {
        self.push_delayed(Duration::ZERO, Err(anyhow::anyhow!(message.to_string()))).await;
    }

    pub async fn push_delayed(&self, delay: Duration, outcome: anyhow::Result<ResultDocument>) {
        self.outcomes.lock().await.push_back((delay, outcome));
    }
}

impl SearchExecutor for CannedExecutor {
    fn execute<'a>(
        &'a self,
        query: &'a QueryDocument,
        result_type: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<ResultDocument>> {
        async move {
            self.calls.lock().await.push((query.clone(), result_type.to_string()));
            let next = self.outcomes.lock().await.pop_front();
            let (delay, outcome) = next.unwrap_or_else(|| (Duration::ZERO, Err(anyhow::anyhow!("no canned response"))));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
        .boxed()
    }
}

/// Answers every query with one hit whose id is the query text.
#[derive(Default)]
pub struct EchoExecutor;

impl SearchExecutor for EchoExecutor {
    fn execute<'a>(
        &'a self,
        query: &'a QueryDocument,
        _result_type: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<ResultDocument>> {
        async move {
            let text = match &query.query {
                Query::MultiMatch(multi_match) => multi_match.query.clone(),
                other => anyhow::bail!("unexpected query: {:?}", other),
            };
            tokio::task::yield_now().await;
            Ok(response(&[text.as_str()], 1, json!({})))
        }
        .boxed()
    }
}

pub fn response(ids: &[&str], total: u64, facets: serde_json::Value) -> ResultDocument {
    serde_json::from_value(json!({
        "took": 1,
        "timed_out": false,
        "hits": {
            "total": total,
            "hits": ids.iter().map(|id| json!({"_id": id, "_type": "event"})).collect::<Vec<_>>()
        },
        "facets": facets
    }))
    .unwrap()
}
