//! HTTP-level tests for the image API.

mod common;

use common::{api_url, image_form, TestHarness, PNG_BYTES};
use gl_core::config::Config;
use serde_json::{json, Value};

async fn upload(
    client: &reqwest::Client,
    addr: std::net::SocketAddr,
    form: reqwest::multipart::Form,
) -> reqwest::Response {
    client
        .post(api_url(addr, "/images"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

fn names(body: &Value) -> Vec<&str> {
    body["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn upload_then_file_returns_identical_bytes() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    for (file, mime) in [
        ("a.png", "image/png"),
        ("b.jpg", "image/jpeg"),
        ("c.jpg", "image/jpg"),
        ("d.svg", "image/svg+xml"),
    ] {
        let resp = upload(&client, addr, image_form(file, mime, PNG_BYTES)).await;
        assert_eq!(resp.status(), 201, "{mime}");
        let record: Value = resp.json().await.unwrap();
        let id = record["id"].as_str().unwrap();
        assert_eq!(record["name"], file);
        assert_eq!(record["mimeType"], mime);

        let file_resp = client
            .get(api_url(addr, &format!("/images/{id}/file")))
            .send()
            .await
            .unwrap();
        assert_eq!(file_resp.status(), 200);
        assert!(file_resp.headers().get("cache-control").is_some());
        assert_eq!(file_resp.bytes().await.unwrap().as_ref(), PNG_BYTES);
    }
}

#[tokio::test]
async fn upload_keeps_name_and_dimensions() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let form = image_form("raw.png", "image/png", PNG_BYTES)
        .text("name", "Sunset")
        .text("width", "640")
        .text("height", "480");
    let resp = upload(&client, addr, form).await;
    assert_eq!(resp.status(), 201);

    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["name"], "Sunset");
    assert_eq!(record["originalName"], "raw.png");
    assert_eq!(record["width"], 640);
    assert_eq!(record["height"], 480);
    assert_eq!(record["size"], PNG_BYTES.len());
    let id = record["id"].as_str().unwrap();
    assert!(record["filename"].as_str().unwrap().starts_with(id));
    assert!(record["uploadedAt"].is_string());
}

#[tokio::test]
async fn oversize_upload_reports_size_in_mb() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let data = vec![0u8; 6 * 1024 * 1024];
    let resp = upload(&client, addr, image_form("big.png", "image/png", &data)).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("5MB"), "{message}");
    assert!(message.contains("6.00MB"), "{message}");
    assert_eq!(body["details"][0]["field"], "file");

    assert!(harness.ctx.metadata.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn disallowed_image_type_is_named() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = upload(&client, addr, image_form("anim.gif", "image/gif", PNG_BYTES)).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("image/gif"));
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = upload(&client, addr, image_form("notes.txt", "text/plain", b"hello")).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "File must be an image");
}

#[tokio::test]
async fn custom_upload_limit_applies() {
    let mut config = Config::default();
    config.upload.max_file_bytes = 10;
    let (_harness, addr) = TestHarness::with_server_config(config).await;
    let client = reqwest::Client::new();

    let resp = upload(&client, addr, image_form("a.png", "image/png", &[0u8; 11])).await;
    assert_eq!(resp.status(), 400);
    let resp = upload(&client, addr, image_form("a.png", "image/png", &[0u8; 10])).await;
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn rename_round_trip_keeps_identity() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let record = harness.seed("before", Some(common::minute(0))).await;

    let resp = client
        .put(api_url(addr, &format!("/images/{}", record.id)))
        .json(&json!({ "name": "X", "filename": "hijack.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let fetched: Value = client
        .get(api_url(addr, &format!("/images/{}", record.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["name"], "X");
    assert_eq!(fetched["id"], record.id.to_string());
    assert_eq!(fetched["filename"], record.filename);
}

#[tokio::test]
async fn rename_rejects_empty_name() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let record = harness.seed("keep", None).await;

    let resp = client
        .put(api_url(addr, &format!("/images/{}", record.id)))
        .json(&json!({ "name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let stored = harness.ctx.metadata.find_by_id(record.id).await.unwrap();
    assert_eq!(stored.unwrap().name, "keep");
}

#[tokio::test]
async fn rename_without_name_leaves_record_unchanged() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let record = harness.seed("keep", Some(common::minute(3))).await;

    let resp = client
        .put(api_url(addr, &format!("/images/{}", record.id)))
        .json(&json!({ "description": "ignored" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: gl_core::ImageRecord = resp.json().await.unwrap();
    assert_eq!(body, record);
}

#[tokio::test]
async fn rename_unknown_image_is_404() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(api_url(addr, &format!("/images/{}", gl_core::ImageId::new())))
        .json(&json!({ "name": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn delete_twice_is_404_and_blob_is_gone() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let record = harness.seed("doomed", None).await;
    let url = api_url(addr, &format!("/images/{}", record.id));

    let first = client.delete(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["message"], "Image deleted successfully");
    assert_eq!(body["id"], record.id.to_string());

    assert!(!harness.ctx.blobs.exists(&record.filename).await);
    let file = client.get(format!("{url}/file")).send().await.unwrap();
    assert_eq!(file.status(), 404);

    let second = client.delete(&url).send().await.unwrap();
    assert_eq!(second.status(), 404);
}

#[tokio::test]
async fn search_is_case_insensitive_substring() {
    let (harness, addr) = TestHarness::with_server().await;
    harness
        .seed_names(&["cat.png", "Cats.png", "dog.png"])
        .await;

    let body: Value = reqwest::get(api_url(addr, "/images?search=cat"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let mut found = names(&body);
    found.sort_unstable();
    assert_eq!(found, vec!["Cats.png", "cat.png"]);
    assert_eq!(body["total"], 2);
    assert_eq!(body["search"], "cat");

    let upper: Value = reqwest::get(api_url(addr, "/images?search=CAT"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(upper["total"], 2);
}

#[tokio::test]
async fn sort_by_upload_time_both_directions() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed_names(&["first", "second", "third"]).await;

    let asc: Value = reqwest::get(api_url(addr, "/images?sort=uploadedAt&order=asc"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&asc), vec!["first", "second", "third"]);

    let desc: Value = reqwest::get(api_url(addr, "/images?sort=uploadedAt&order=desc"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&desc), vec!["third", "second", "first"]);

    let default: Value = reqwest::get(api_url(addr, "/images"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&default), names(&desc));
}

#[tokio::test]
async fn sort_by_name_ignores_case() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed_names(&["banana", "Apple", "cherry"]).await;

    let body: Value = reqwest::get(api_url(addr, "/images?sort=name&order=asc"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&body), vec!["Apple", "banana", "cherry"]);
}

#[tokio::test]
async fn records_without_timestamp_sort_oldest() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed("legacy", None).await;
    harness.seed_names(&["recent"]).await;

    let body: Value = reqwest::get(api_url(addr, "/images?order=asc"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&body), vec!["legacy", "recent"]);
}

#[tokio::test]
async fn limit_truncates_and_total_counts_page() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed_names(&["a", "b", "c"]).await;

    let body: Value = reqwest::get(api_url(addr, "/images?limit=1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 1);
    assert_eq!(body["total"], 1);
    assert_eq!(names(&body), vec!["c"]);
}

#[tokio::test]
async fn bad_query_parameters_are_400() {
    let (_harness, addr) = TestHarness::with_server().await;

    for query in ["sort=size", "order=sideways", "limit=abc"] {
        let resp = reqwest::get(api_url(addr, &format!("/images?{query}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{query}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "validation_error");
    }
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let (_harness, addr) = TestHarness::with_server().await;
    let body: Value = reqwest::get(api_url(addr, "/images"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
    assert!(body["images"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("x-request-id").is_some());
}
