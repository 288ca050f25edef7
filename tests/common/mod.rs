//! Common test utilities for tablesnap integration tests
//!
//! A [`FakeAirtable`] serves both the listing API and the attachment host from
//! one wiremock server.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::collections::BTreeMap;
use tablesnap::{BackupOptions, Config};
use url::Url;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "keyTESTTESTTESTTE";

/// Mock listing API + attachment host
pub struct FakeAirtable {
    pub server: MockServer,
}

impl FakeAirtable {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Options pointing a run at this server
    pub fn options(&self) -> BackupOptions {
        BackupOptions {
            api_root: Url::parse(&format!("{}/v0/", self.server.uri())).unwrap(),
            attachment_link_prefix: self.link_prefix(),
            download_workers: 1,
        }
    }

    pub fn link_prefix(&self) -> String {
        format!("{}/.attachments/", self.server.uri())
    }

    pub fn link(&self, id: &str) -> String {
        format!("{}{id}/photo.png", self.link_prefix())
    }

    /// Serve `pages` for `base/table`, chaining them with offsets `o1`, `o2`, ...
    pub async fn mount_table(&self, base: &str, table: &str, pages: Vec<Vec<Value>>) {
        let count = pages.len();
        for (i, records) in pages.into_iter().enumerate() {
            let mut body = json!({ "records": records });
            if i + 1 < count {
                body["offset"] = json!(format!("o{}", i + 1));
            }
            let mock = Mock::given(method("GET"))
                .and(path(format!("/v0/{base}/{table}")))
                .and(header("Authorization", format!("Bearer {TOKEN}").as_str()));
            let mock = if i == 0 {
                mock.and(query_param_is_missing("offset"))
            } else {
                mock.and(query_param("offset", format!("o{i}").as_str()))
            };
            mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&self.server)
                .await;
        }
    }

    /// Answer every request for `base/table` with `status`
    pub async fn mount_failing_table(&self, base: &str, table: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/v0/{base}/{table}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Serve `body` at the link for attachment `id`
    pub async fn mount_attachment(&self, id: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/.attachments/{id}/photo.png")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Number of requests made to the attachment host so far
    pub async fn attachment_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().starts_with("/.attachments/"))
            .count()
    }
}

/// A record as the listing API returns it
pub fn record(id: &str, fields: Value) -> Value {
    json!({
        "id": id,
        "createdTime": "2022-02-02T02:02:02.000Z",
        "fields": fields,
    })
}

/// `n` plain records
pub fn plain_records(prefix: &str, n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| record(&format!("{prefix}{i}"), json!({ "Name": format!("row {i}") })))
        .collect()
}

/// An attachment descriptor as it appears inside a field
pub fn descriptor(link: &str, id: &str, size: usize) -> Value {
    json!({
        "id": id,
        "url": link,
        "filename": "photo.png",
        "size": size,
        "type": "image/png",
        "thumbnails": {
            "small": { "url": "https://thumbs.example.com/s.png", "width": 36, "height": 36 }
        }
    })
}

/// Config for the given base -> tables mapping
pub fn config(entries: &[(&str, &[&str])]) -> Config {
    let app_tables: BTreeMap<String, Vec<String>> = entries
        .iter()
        .map(|(base, tables)| {
            (
                base.to_string(),
                tables.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect();
    Config {
        token: TOKEN.to_string(),
        app_tables,
    }
}
