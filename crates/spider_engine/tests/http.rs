use std::fs;

use spider_engine::{
    DownloadProvider, DownloadRequest, FailureKind, HttpDownloadSettings, HttpDownloader,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(url: String, temp: &TempDir, relative: &str) -> DownloadRequest {
    DownloadRequest {
        url,
        destination: temp.path().join(relative),
        link_type: "general".to_string(),
        provider_override: None,
    }
}

#[test]
fn supports_direct_link_types_only() {
    let downloader = HttpDownloader::new(HttpDownloadSettings::default()).unwrap();
    assert_eq!(downloader.name(), "http");
    assert!(downloader.supports("general"));
    assert!(downloader.supports("torrent"));
    assert!(!downloader.supports("magnet"));
}

#[tokio::test]
async fn download_writes_body_to_nested_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = HttpDownloader::new(HttpDownloadSettings::default()).unwrap();
    let req = request(format!("{}/media/1.mp4", server.uri()), &temp, "Video/a/1.mp4");

    downloader.download(&req).await.expect("download ok");
    assert_eq!(fs::read(&req.destination).unwrap(), b"video-bytes");
}

#[tokio::test]
async fn download_fails_on_http_status_without_creating_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = HttpDownloader::new(HttpDownloadSettings::default()).unwrap();
    let req = request(format!("{}/missing", server.uri()), &temp, "Common/missing.bin");

    let err = downloader.download(&req).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(!req.destination.exists());
}

#[tokio::test]
async fn download_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string("01234567890"))
        .mount(&server)
        .await;

    let settings = HttpDownloadSettings {
        max_bytes: 10,
        ..HttpDownloadSettings::default()
    };
    let temp = TempDir::new().unwrap();
    let downloader = HttpDownloader::new(settings).unwrap();
    let req = request(format!("{}/large", server.uri()), &temp, "large.bin");

    let err = downloader.download(&req).await.unwrap_err();
    assert!(matches!(
        err.kind,
        FailureKind::TooLarge { max_bytes: 10, .. }
    ));
    assert!(!req.destination.exists());
}

#[tokio::test]
async fn invalid_url_is_reported() {
    let temp = TempDir::new().unwrap();
    let downloader = HttpDownloader::new(HttpDownloadSettings::default()).unwrap();
    let req = request("not a url".to_string(), &temp, "x.bin");

    let err = downloader.download(&req).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
