// src/services/test_server.rs

//! In-process HTTP server mimicking the catalog endpoints for tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub(crate) struct TestServer {
    addr: String,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let app = routes(addr.clone(), hits.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hits, task }
    }

    /// A URL nobody listens on.
    pub(crate) async fn closed_url() -> String {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/closed")
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Number of requests served so far.
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) fn lookup_body(id: u64, base: &str) -> String {
    format!(
        r#"{{
            "resultCount": 1,
            "results": [{{
                "collectionId": {id},
                "artistName": "arts_{id}",
                "collectionName": "col_{id}",
                "genreIds": ["1", "2", "x"],
                "artworkUrl30": "30_{id}",
                "artworkUrl60": "60_{id}",
                "artworkUrl100": "100_{id}",
                "feedUrl": "{base}/rss/{id}"
            }}]
        }}"#
    )
}

pub(crate) fn rss_body(id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Show {id}</title>
    <link>https://example.com/{id}</link>
    <description><![CDATA[Description {id}]]></description>
    <language>en-US</language>
    <itunes:author>Author {id}</itunes:author>
    <lastBuildDate>Mon, 01 Jan 2024 00:00:00 +0000</lastBuildDate>
    <item>
      <title>Episode {id}.2</title>
      <description>Latest episode</description>
      <pubDate>Sun, 31 Dec 2023 00:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Episode {id}.1</title>
      <description>Older episode</description>
    </item>
  </channel>
</rss>"#
    )
}

const GENRES_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
<a class="top-level-genre" href="/genre/podcasts-arts/id1">Arts</a>
<ul class="top-level-subgenres">
  <li><a href="/genre/podcasts-arts-books/id2">Books</a></li>
</ul>
<a class="top-level-genre" href="/genre/podcasts-broken/idd">Broken</a>
<a class="other" href="/genre/podcasts-ignored/id9">Ignored</a>
</body>
</html>"#;

fn genre_page(slug_id: &str) -> String {
    let n = slug_id.trim_start_matches("id");
    format!(
        r#"<!DOCTYPE html>
<html>
<body>
<div id="selectedcontent">
  <div class="column">
    <a href="/podcast/show-{n}1/id{n}1">Show {n}1</a>
    <a href="/podcast/show-{n}2/id{n}2">Show {n}2</a>
  </div>
  <div class="column">
    <a href="/podcast/shared/id100">Shared Show</a>
  </div>
</div>
</body>
</html>"#
    )
}

fn routes(addr: String, hits: Arc<AtomicUsize>) -> Router {
    let counted = move || {
        hits.fetch_add(1, Ordering::SeqCst);
    };

    let c = counted.clone();
    let test = move |Path(n): Path<String>| {
        c();
        async move { format!(r#"{{"test": {n}}}"#) }
    };

    let c = counted.clone();
    let not_found = move || {
        c();
        async { (StatusCode::NOT_FOUND, "<p>error</p>") }
    };

    let c = counted.clone();
    let invalid = move || {
        c();
        async { r#"{"data": 1}"# }
    };

    let c = counted.clone();
    let base = addr.clone();
    let lookup = move |Query(params): Query<HashMap<String, String>>| {
        c();
        let base = base.clone();
        async move { lookup_response(&params, &base) }
    };

    let c = counted.clone();
    let rss = move |Path(id): Path<String>| {
        c();
        async move {
            if id == "empty" {
                return (StatusCode::OK, r#"<rss version="2.0"></rss>"#.to_string());
            }
            (StatusCode::OK, rss_body(&id))
        }
    };

    let c = counted.clone();
    let genres = move || {
        c();
        async { GENRES_PAGE }
    };

    let c = counted;
    let genre = move |Path((_slug, id)): Path<(String, String)>| {
        c();
        async move { genre_page(&id) }
    };

    Router::new()
        .route("/test/:n", get(test))
        .route("/404", get(not_found))
        .route("/invalid", get(invalid))
        .route("/lookup", get(lookup))
        .route("/rss/:id", get(rss))
        .route("/genres", get(genres))
        .route("/genre/:slug/:id", get(genre))
}

fn lookup_response(params: &HashMap<String, String>, base: &str) -> Response {
    let id: u64 = match params.get("id").and_then(|id| id.parse().ok()) {
        Some(id) => id,
        None => return StatusCode::BAD_REQUEST.into_response(),
    };

    match id {
        0 => r#"{"resultCount": 0, "results": []}"#.into_response(),
        404 => (StatusCode::NOT_FOUND, "<p>error</p>").into_response(),
        _ => lookup_body(id, base).into_response(),
    }
}
