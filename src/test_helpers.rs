//! Shared test helpers: fabricated records and a scripted page fetcher.

use crate::client::PageFetcher;
use crate::error::{Error, Result};
use crate::types::{FieldValue, Page, Record};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Build a record with the given fields
pub(crate) fn record(id: &str, fields: Vec<(&str, FieldValue)>) -> Record {
    Record {
        id: id.to_string(),
        created_time: "2021-03-04T05:06:07.000Z".to_string(),
        fields: fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    }
}

/// `n` records named `{prefix}0`, `{prefix}1`, ...
pub(crate) fn records(prefix: &str, n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            record(
                &format!("{prefix}{i}"),
                vec![("Name", FieldValue::String(format!("row {i}")))],
            )
        })
        .collect()
}

/// A page with a continuation token (empty string = last page)
pub(crate) fn page(records: Vec<Record>, offset: &str) -> Page {
    Page {
        records,
        offset: Some(offset.to_string()),
    }
}

/// Page fetcher that replays scripted responses per (base, table)
///
/// Each call pops the next response for its key. Running out of script is an
/// error so tests notice unexpected extra requests.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    script: Mutex<HashMap<(String, String), VecDeque<Result<Page>>>>,
    calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `base/table`
    pub(crate) fn push(&self, base: &str, table: &str, response: Result<Page>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .entry((base.to_string(), table.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Every call made so far, as (base, table, offset)
    pub(crate) fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for one table
    pub(crate) fn calls_for(&self, table: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, t, _)| t == table)
            .count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, base: &str, table: &str, offset: Option<&str>) -> Result<Page> {
        self.calls.lock().unwrap().push((
            base.to_string(),
            table.to_string(),
            offset.map(str::to_string),
        ));
        // Let sibling workers interleave
        tokio::task::yield_now().await;
        self.script
            .lock()
            .unwrap()
            .get_mut(&(base.to_string(), table.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(Error::config(
                    format!("unscripted request for {base}/{table}"),
                    None,
                ))
            })
    }
}

/// Fields holding one attachment descriptor
pub(crate) fn attachment_field(url: &str, id: &str, size: serde_json::Value) -> FieldValue {
    let json = serde_json::json!([{
        "id": id,
        "url": url,
        "filename": "photo.png",
        "size": size,
        "type": "image/png",
    }]);
    serde_json::from_value(json).unwrap()
}

/// Wrap records into a single-table map
pub(crate) fn tables(table: &str, records: Vec<Record>) -> BTreeMap<String, Vec<Record>> {
    let mut map = BTreeMap::new();
    map.insert(table.to_string(), records);
    map
}
