//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalogue (a listing, an
//! individual product page and a system page with a zip bundle) and run the
//! full crawl cycle end-to-end against a temporary library root.

use asset_ripper::config::{Config, CrawlerConfig, OutputConfig, SearchConfig, SiteConfig};
use asset_ripper::crawler::{crawl, CrawlOptions, QUEUE_FILE, SEEN_LOG_FILE};
use asset_ripper::output::scan_library;
use asset_ripper::storage::{load_manifest, manifest_path};
use asset_ripper::FailureKind;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at `root` with the listing as seed
fn create_test_config(base_url: &str, root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages: 50,
            max_downloads: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_retries: 0,
            backoff_base_ms: 1,
            request_timeout_secs: 5,
        },
        output: OutputConfig {
            root: root.display().to_string(),
        },
        site: SiteConfig {
            seeds: vec![format!("{}/pm/", base_url)],
            hosts: vec![],
            catalogue_segment: "/pm/".to_string(),
            individual_segment: "/pm/individual/".to_string(),
            system_segment: "/pm/system/".to_string(),
            asset_path: "/dam/models/".to_string(),
            search: SearchConfig {
                endpoint: String::new(),
                ..SearchConfig::default()
            },
            ..SiteConfig::default()
        },
        ..Config::default()
    }
}

fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in members {
        writer
            .start_file(name.to_string(), zip::write::SimpleFileOptions::default())
            .expect("start zip member");
        writer.write_all(data).expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, at: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

/// Serves the catalogue fixture
async fn mount_catalogue(server: &MockServer) {
    mount_page(
        server,
        "/pm/",
        r#"<html><body>
            <a href="/pm/individual/zeph-stool/">Zeph Stool</a>
            <a href="/pm/individual/zeph-stool/?utm_source=nav">Zeph Stool again</a>
            <a href="/pm/system/ubi/">Ubi</a>
            <a href="https://elsewhere.example.org/">Partner</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/pm/individual/zeph-stool/",
        r#"<html><body>
            <nav class="breadcrumb">Seating &gt; Stools</nav>
            <h1>Zeph Stool</h1>
            <a href="/dam/models/z/zeph_stool/HMI_Zeph_Stool.rfa">Revit (12 KB)</a>
            <a href="/dam/models/z/zeph_stool/HMI_Zeph_Stool.skp">SketchUp</a>
            <a href="/dam/models/z/zeph_stool/HMI_Zeph_Stool_2D.dwg">AutoCAD 2D</a>
            <a href="/pm/">Back to catalogue</a>
            <a href="/pm/system/ubi/">Ubi</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/pm/system/ubi/",
        r#"<html><body>
            <h1>Ubi</h1>
            <a href="/dam/models/u/ubi/Ubi_All.zip">Download All Revit Family Components</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_file(
        server,
        "/dam/models/z/zeph_stool/HMI_Zeph_Stool.rfa",
        b"revit-family".to_vec(),
    )
    .await;
    mount_file(
        server,
        "/dam/models/z/zeph_stool/HMI_Zeph_Stool.skp",
        b"sketchup-model".to_vec(),
    )
    .await;
    mount_file(
        server,
        "/dam/models/z/zeph_stool/HMI_Zeph_Stool_2D.dwg",
        b"drawing".to_vec(),
    )
    .await;
    mount_file(
        server,
        "/dam/models/u/ubi/Ubi_All.zip",
        zip_bytes(&[
            ("Ubi_Desk.rfa", b"desk"),
            ("readme.txt", b"ignore me"),
            ("Ubi_Return.rfa", b"return"),
        ]),
    )
    .await;
}

/// All regular files under `root` with their modification times
fn snapshot_tree(root: &Path) -> Vec<(PathBuf, std::time::SystemTime)> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).expect("read dir") {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let modified = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .expect("mtime");
                files.push((path, modified));
            }
        }
    }
    files.sort();
    files
}

#[tokio::test]
async fn test_full_crawl_builds_library() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    let config = create_test_config(&server.uri(), root);

    let stats = crawl(config, CrawlOptions::default())
        .await
        .expect("crawl runs");

    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.pages_failed, 0);
    assert_eq!(stats.candidates_found, 4);
    assert_eq!(stats.candidates_filtered, 1);
    assert_eq!(stats.files_written, 3);
    assert_eq!(stats.archive_members, 2);
    assert_eq!(stats.manifests_updated, 2);
    assert_eq!(stats.total_failures(), 0);

    // Direct downloads
    let zeph = root.join("herman_miller/zeph-stool");
    assert_eq!(
        std::fs::read(zeph.join("revit/HMI_Zeph_Stool.rfa")).expect("revit file"),
        b"revit-family"
    );
    assert!(zeph.join("sketchup/HMI_Zeph_Stool.skp").is_file());
    assert!(!zeph.join("autocad_2d").exists());

    let manifest = load_manifest(&manifest_path(root, "herman_miller", "zeph-stool"))
        .expect("manifest readable")
        .expect("manifest exists");
    assert_eq!(manifest.product, "Zeph Stool");
    assert_eq!(manifest.category.as_deref(), Some("Seating > Stools"));
    assert_eq!(manifest.files.len(), 2);
    assert_eq!(
        manifest.source_pages,
        vec![format!("{}/pm/individual/zeph-stool/", server.uri())]
    );

    // System bundle and its members
    let ubi = load_manifest(&manifest_path(root, "herman_miller", "ubi"))
        .expect("manifest readable")
        .expect("manifest exists");
    assert_eq!(ubi.files.len(), 3);
    let members: Vec<_> = ubi
        .files
        .iter()
        .filter(|r| r.stored_relative_path.contains("/extracted/"))
        .collect();
    assert_eq!(members.len(), 2);
    for member in members {
        assert_eq!(
            member.source_url.as_deref(),
            Some(format!("{}/dam/models/u/ubi/Ubi_All.zip#archive", server.uri()).as_str())
        );
        assert_eq!(member.link_text, "Extracted from Ubi_All.zip");
    }
    assert!(root
        .join("herman_miller/ubi/revit/extracted/Ubi_Desk.rfa")
        .is_file());
    assert!(!root
        .join("herman_miller/ubi/revit/extracted/readme.txt")
        .exists());

    // Seen-log lists each page once
    let log = std::fs::read_to_string(root.join(SEEN_LOG_FILE)).expect("seen log");
    assert_eq!(log.lines().count(), 3);

    let library = scan_library(root).expect("library scan");
    assert_eq!(library.products, 2);
    assert_eq!(library.files, 5);
    assert!(library.missing_files.is_empty());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    crawl(create_test_config(&server.uri(), root), CrawlOptions::default())
        .await
        .expect("first run");

    // Ignore the seen-log bookkeeping; compare everything in the library
    let library_files = |root: &Path| -> Vec<(PathBuf, std::time::SystemTime)> {
        snapshot_tree(root)
            .into_iter()
            .filter(|(p, _)| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
                name != SEEN_LOG_FILE && name != QUEUE_FILE
            })
            .collect()
    };
    let before = library_files(root);

    let options = CrawlOptions {
        fresh: true,
        ..CrawlOptions::default()
    };
    let stats = crawl(create_test_config(&server.uri(), root), options)
        .await
        .expect("second run");

    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.files_written, 0);
    assert_eq!(stats.files_unchanged, 3);
    assert_eq!(stats.manifests_updated, 0);
    assert_eq!(library_files(root), before);
}

#[tokio::test]
async fn test_seen_pages_are_not_revisited() {
    let server = MockServer::start().await;

    // Each page may be fetched exactly once across both runs
    for (at, body) in [
        ("/pm/", r#"<a href="/pm/individual/a/">A</a><a href="/pm/individual/b/">B</a>"#),
        ("/pm/individual/a/", r#"<a href="/pm/individual/b/">B</a><a href="/pm/">Up</a>"#),
        ("/pm/individual/b/", r#"<a href="/pm/individual/a/">A</a>"#),
    ] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    let first = crawl(create_test_config(&server.uri(), root), CrawlOptions::default())
        .await
        .expect("first run");
    assert_eq!(first.pages_visited, 3);
    assert_eq!(first.pages_enqueued, 2);

    let second = crawl(create_test_config(&server.uri(), root), CrawlOptions::default())
        .await
        .expect("second run");
    assert_eq!(second.pages_fetched, 0);
}

#[tokio::test]
async fn test_failed_page_is_retried_on_next_run() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/pm/",
        r#"<a href="/pm/individual/a/">A</a><a href="/pm/individual/b/">B</a>"#.to_string(),
    )
    .await;
    // First request fails, later ones succeed
    Mock::given(method("GET"))
        .and(path("/pm/individual/a/"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/pm/individual/a/", "<h1>A</h1>".to_string()).await;
    mount_page(&server, "/pm/individual/b/", "<h1>B</h1>".to_string()).await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    let first = crawl(create_test_config(&server.uri(), root), CrawlOptions::default())
        .await
        .expect("first run");
    assert_eq!(first.pages_fetched, 3);
    assert_eq!(first.pages_visited, 2);
    assert_eq!(first.pages_failed, 1);
    let pending = std::fs::read_to_string(root.join(QUEUE_FILE)).expect("queue snapshot");
    assert_eq!(pending, format!("{}/pm/individual/a/\n", server.uri()));

    let second = crawl(create_test_config(&server.uri(), root), CrawlOptions::default())
        .await
        .expect("second run");
    assert_eq!(second.pages_fetched, 1);
    assert_eq!(second.pages_visited, 1);
    assert_eq!(second.pages_failed, 0);

    let log = std::fs::read_to_string(root.join(SEEN_LOG_FILE)).expect("seen log");
    assert!(log
        .lines()
        .any(|line| line == format!("{}/pm/individual/a/", server.uri())));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().join("library");
    let options = CrawlOptions {
        dry_run: true,
        ..CrawlOptions::default()
    };

    let stats = crawl(create_test_config(&server.uri(), &root), options)
        .await
        .expect("dry run");

    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.candidates_planned, 3);
    assert_eq!(stats.by_file_type["revit"], 2);
    assert_eq!(stats.by_file_type["sketchup"], 1);
    assert_eq!(stats.files_written, 0);
    assert!(!root.exists());

    // No asset was requested
    let requests = server.received_requests().await.expect("recording on");
    assert!(requests
        .iter()
        .all(|r| !r.url.path().starts_with("/dam/")));
}

#[tokio::test]
async fn test_download_budget_interrupts_and_resumes() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    let mut config = create_test_config(&server.uri(), root);
    config.crawler.max_downloads = 1;
    let first = crawl(config, CrawlOptions::default())
        .await
        .expect("first run");

    assert!(first.download_budget_reached);
    assert_eq!(first.files_written, 1);
    // The product page was interrupted, so it is still pending
    let pending = std::fs::read_to_string(root.join(QUEUE_FILE)).expect("queue snapshot");
    assert_eq!(
        pending.lines().next(),
        Some(format!("{}/pm/individual/zeph-stool/", server.uri()).as_str())
    );

    // Unchanged files do not count, so the next run makes progress
    let mut config = create_test_config(&server.uri(), root);
    config.crawler.max_downloads = 1;
    let second = crawl(config, CrawlOptions::default())
        .await
        .expect("second run");
    assert_eq!(second.files_unchanged, 1);
    assert_eq!(second.files_written, 1);

    let third = crawl(create_test_config(&server.uri(), root), CrawlOptions::default())
        .await
        .expect("third run");
    assert!(!third.download_budget_reached);
    assert!(root
        .join("herman_miller/ubi/revit/extracted/Ubi_Return.rfa")
        .is_file());
}

#[tokio::test]
async fn test_single_page_mode_ignores_next_pages() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    let options = CrawlOptions {
        single_page: Some(format!("{}/pm/individual/zeph-stool/", server.uri())),
        ..CrawlOptions::default()
    };

    let stats = crawl(create_test_config(&server.uri(), root), options)
        .await
        .expect("single page run");

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.pages_enqueued, 0);
    assert_eq!(stats.files_written, 2);
    assert!(!root.join(SEEN_LOG_FILE).exists());
    assert!(!root.join("herman_miller/ubi").exists());
}

#[tokio::test]
async fn test_failed_downloads_are_counted_and_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/pm/individual/zeph-stool/",
        r#"<h1>Zeph</h1>
           <a href="/dam/models/z/zeph_stool/HMI_Gone.rfa">Revit</a>
           <a href="/dam/models/z/zeph_stool/HMI_Flaky.skp">SketchUp</a>
           <a href="/dam/models/z/zeph_stool/HMI_Zeph_Stool.rfa">Revit</a>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dam/models/z/zeph_stool/HMI_Gone.rfa"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dam/models/z/zeph_stool/HMI_Flaky.skp"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_file(
        &server,
        "/dam/models/z/zeph_stool/HMI_Zeph_Stool.rfa",
        b"ok".to_vec(),
    )
    .await;

    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    let options = CrawlOptions {
        single_page: Some(format!("{}/pm/individual/zeph-stool/", server.uri())),
        ..CrawlOptions::default()
    };

    let stats = crawl(create_test_config(&server.uri(), root), options)
        .await
        .expect("run completes");

    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.failures[&FailureKind::TerminalHttp], 1);
    assert_eq!(stats.failures[&FailureKind::Transient], 1);

    let manifest = load_manifest(&manifest_path(root, "herman_miller", "zeph-stool"))
        .expect("manifest readable")
        .expect("manifest exists");
    assert_eq!(manifest.files.len(), 1);
    assert!(!root
        .join("herman_miller/zeph-stool/revit/HMI_Gone.rfa")
        .exists());
}
