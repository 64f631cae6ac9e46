//! `DriveStorage` and `HttpPreviewFetcher` against a mocked Drive API.
//!
//! Every test starts its own `wiremock::MockServer` and points the client at
//! it, so the real request shapes (paths, query parameters, bearer header,
//! multipart body) are exercised without touching Google.

use drive_pdf2img::{
    ConversionConfig, ConversionOutcome, Converter, DriveStorage, FolderScan, HttpPreviewFetcher,
    OutputFormat, Pdf2ImgError, PreviewFetcher, StaticToken, Storage, StorageError,
};
use image::{DynamicImage, Rgba, RgbaImage};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

fn storage_for(server: &MockServer) -> DriveStorage {
    DriveStorage::new(Arc::new(StaticToken::new("test-token")))
        .with_api_base(format!("{}/drive/v3", server.uri()))
        .with_upload_base(format!("{}/upload/drive/v3", server.uri()))
}

async fn mount_folder(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/drive/v3/files/{id}")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": "Scans",
            "mimeType": FOLDER_MIME,
        })))
        .mount(server)
        .await;
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 7, Rgba([1, 2, 3, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode fixture");
    buf
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ── Storage operations ───────────────────────────────────────────────────────

#[tokio::test]
async fn open_folder_accepts_folders() {
    let server = MockServer::start().await;
    mount_folder(&server, "FOLDER1").await;

    let folder = storage_for(&server).open_folder("FOLDER1").await.unwrap();
    assert_eq!(folder.name, "Scans");
    assert!(folder.is_folder());
}

#[tokio::test]
async fn open_folder_rejects_plain_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/DOC1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "DOC1",
            "name": "invoice.pdf",
            "mimeType": "application/pdf",
        })))
        .mount(&server)
        .await;

    let err = storage_for(&server).open_folder("DOC1").await.unwrap_err();
    assert!(matches!(err, StorageError::NotAFolder { .. }), "got {err:?}");
}

#[tokio::test]
async fn status_codes_map_to_storage_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "File not found: missing." }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/flaky"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "Backend Error" }
        })))
        .mount(&server)
        .await;

    let storage = storage_for(&server);
    assert_eq!(
        storage.get_file("missing").await.unwrap_err(),
        StorageError::NotFound {
            id: "missing".into()
        }
    );
    assert_eq!(
        storage.get_file("private").await.unwrap_err(),
        StorageError::PermissionDenied {
            id: "private".into()
        }
    );
    assert_eq!(
        storage.get_file("flaky").await.unwrap_err(),
        StorageError::Api {
            status: 500,
            message: "Backend Error".into()
        }
    );
}

#[tokio::test]
async fn list_page_sends_parents_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'FOLDER1' in parents and trashed = false"))
        .and(query_param("pageSize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                { "id": "a", "name": "a.pdf", "mimeType": "application/pdf" },
                { "id": "b", "name": "b.txt", "mimeType": "text/plain" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = storage_for(&server)
        .with_page_size(50)
        .list_page("FOLDER1", None)
        .await
        .unwrap();
    assert_eq!(page.files.len(), 2);
    assert_eq!(page.files[1].mime_type, "text/plain");
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn folder_scan_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{ "id": "c", "name": "c.pdf", "mimeType": "application/pdf" }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "p2",
            "files": [
                { "id": "a", "name": "a.pdf", "mimeType": "application/pdf" },
                { "id": "b", "name": "b.pdf", "mimeType": "application/pdf" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = storage_for(&server);
    let mut scan = FolderScan::new(&storage, "FOLDER1");
    let mut ids = Vec::new();
    while let Some(f) = scan.next().await.unwrap() {
        ids.push(f.id);
    }
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(scan.pages_fetched(), 2);
}

#[tokio::test]
async fn create_file_posts_multipart_related_to_root() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(header("authorization", "Bearer test-token"))
        .and(|req: &Request| {
            let content_type = req
                .headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            content_type.starts_with("multipart/related; boundary=")
                && contains(&req.body, br#""name":"invoice.png""#)
                && !contains(&req.body, b"parents")
                && contains(&req.body, b"fake-image-bytes")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "NEW1",
            "name": "invoice.png",
            "mimeType": "image/png",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = storage_for(&server)
        .create_file("invoice.png", "image/png", b"fake-image-bytes".to_vec())
        .await
        .unwrap();
    assert_eq!(created.id, "NEW1");
}

// ── Preview fetch ────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_fetcher_returns_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbnail"))
        .and(query_param("id", "DOC1"))
        .and(query_param("sz", "w1000"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![9, 8, 7]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    let url = format!("{}/thumbnail?id=DOC1&sz=w1000", server.uri());

    let preview = HttpPreviewFetcher::new(None)
        .unwrap()
        .fetch(&url, headers)
        .await
        .unwrap();
    assert_eq!(preview.bytes, vec![9, 8, 7]);
    assert_eq!(preview.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn http_fetcher_reports_status_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbnail"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let url = format!("{}/thumbnail?id=DOC1&sz=w1000", server.uri());
    let err = HttpPreviewFetcher::new(Some(5))
        .unwrap()
        .fetch(&url, HeaderMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"), "got {err}");
}

#[tokio::test]
async fn fetcher_uses_the_supplied_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbnail"))
        .and(header("user-agent", "pdf2img-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2]))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .user_agent("pdf2img-tests")
        .build()
        .unwrap();
    let url = format!("{}/thumbnail?id=DOC1&sz=w1000", server.uri());

    let preview = HttpPreviewFetcher::with_client(client)
        .fetch(&url, HeaderMap::new())
        .await
        .unwrap();
    assert_eq!(preview.bytes, vec![1, 2]);
}

#[tokio::test]
async fn upload_boundary_header_matches_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(|req: &Request| {
            let Some(boundary) = req
                .headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("multipart/related; boundary="))
            else {
                return false;
            };
            let closing = format!("\r\n--{boundary}--\r\n");
            req.body.ends_with(closing.as_bytes())
                && !contains(b"drive_pdf2img_part_boundary raw", boundary.as_bytes())
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "NEW2", "name": "odd.png", "mimeType": "image/png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = storage_for(&server)
        .create_file(
            "odd.png",
            "image/png",
            b"drive_pdf2img_part_boundary raw".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(created.id, "NEW2");
}

// ── Full pipeline over HTTP ──────────────────────────────────────────────────

fn http_converter(server: &MockServer) -> Converter {
    let token = Arc::new(StaticToken::new("test-token"));
    let config = ConversionConfig::builder()
        .thumbnail_endpoint(format!("{}/thumbnail", server.uri()))
        .build()
        .unwrap();
    let storage = DriveStorage::new(token.clone())
        .with_api_base(format!("{}/drive/v3", server.uri()))
        .with_upload_base(format!("{}/upload/drive/v3", server.uri()));
    Converter::new(
        Arc::new(storage),
        Arc::new(HttpPreviewFetcher::new(None).unwrap()),
        token,
        config,
    )
}

#[tokio::test]
async fn converts_through_mocked_drive() {
    let server = MockServer::start().await;
    mount_folder(&server, "FOLDER1").await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                { "id": "TXT", "name": "invoice.txt", "mimeType": "text/plain" },
                { "id": "PDF", "name": "invoice.pdf", "mimeType": "application/pdf" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/PDF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "PDF", "name": "invoice.pdf", "mimeType": "application/pdf"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumbnail"))
        .and(query_param("id", "PDF"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(|req: &Request| {
            contains(&req.body, br#""name":"invoice.jpg""#)
                && contains(&req.body, b"Content-Type: image/jpeg")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "IMG1", "name": "invoice.jpg", "mimeType": "image/jpeg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = http_converter(&server)
        .convert_detailed("FOLDER1", "invoice", OutputFormat::Jpeg)
        .await
        .unwrap();

    match outcome {
        ConversionOutcome::Created { file, .. } => {
            assert_eq!(file.id, "IMG1");
            assert_eq!(file.source_id, "PDF");
        }
        other => panic!("expected Created, got {other:?}"),
    }
}

#[tokio::test]
async fn thumbnail_403_yields_none_without_upload() {
    let server = MockServer::start().await;
    mount_folder(&server, "FOLDER1").await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{ "id": "PDF", "name": "invoice.pdf", "mimeType": "application/pdf" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/PDF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "PDF", "name": "invoice.pdf", "mimeType": "application/pdf"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumbnail"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = http_converter(&server)
        .convert("FOLDER1", "invoice", OutputFormat::Png)
        .await
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn missing_folder_over_http_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/GONE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = http_converter(&server)
        .convert("GONE", "invoice", OutputFormat::Png)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Pdf2ImgError::FolderUnavailable {
            source: StorageError::NotFound { .. },
            ..
        }
    ));
}
