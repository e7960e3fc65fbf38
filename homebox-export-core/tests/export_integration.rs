use futures::stream::{self, StreamExt};
use homebox_export_core::config::ExportConfig;
use homebox_export_core::contract::{
    Attachment, AttachmentStream, Document, FailureStage, Item, MockExportReporter,
    MockHomeboxApi, PaginationResult, TokenResponse,
};
use homebox_export_core::error::{ApiError, ConfigError, ExportError};
use homebox_export_core::export::Exporter;
use homebox_export_core::report::TracingReporter;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn config(output_dir: &Path) -> ExportConfig {
    ExportConfig {
        server_url: "http://localhost".to_string(),
        username: "test".to_string(),
        password: "test".to_string(),
        output_dir: output_dir.to_path_buf(),
        page_size: 100,
    }
}

fn item(id: &str, name: &str, attachments: Vec<Attachment>) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        attachments,
        ..Default::default()
    }
}

fn attachment(id: &str, title: &str) -> Attachment {
    Attachment {
        id: id.to_string(),
        kind: "attachment".to_string(),
        document: Document {
            title: title.to_string(),
            ..Default::default()
        },
        primary: false,
    }
}

fn page(items: Vec<Item>) -> PaginationResult<Item> {
    PaginationResult {
        total: items.len() as u64,
        items,
        page: 1,
        page_size: 100,
    }
}

fn body(content: &'static [u8]) -> AttachmentStream {
    stream::iter(vec![Ok(content.to_vec())]).boxed()
}

fn logged_in(api: &mut MockHomeboxApi) {
    api.expect_login().times(1).returning(|_, _| {
        Ok(TokenResponse {
            token: "Bearer test-token".to_string(),
            ..Default::default()
        })
    });
}

/// Serves `items` on page 1, an empty page afterwards, and each item's detail by id.
fn serving(items: Vec<Item>) -> MockHomeboxApi {
    let mut api = MockHomeboxApi::new();
    logged_in(&mut api);

    let listing = items.clone();
    api.expect_list_items().returning(move |page_no, _| {
        if page_no == 1 {
            Ok(page(listing.clone()))
        } else {
            Ok(PaginationResult::default())
        }
    });

    api.expect_get_item().returning(move |id| {
        items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                body: "item not found".to_string(),
            })
    });
    api
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    for dir in fs::read_dir(root).unwrap() {
        let dir = dir.unwrap().path();
        for file in fs::read_dir(&dir).unwrap() {
            let file = file.unwrap().path();
            let rel = file.strip_prefix(root).unwrap().to_path_buf();
            files.insert(rel, fs::read(&file).unwrap());
        }
    }
    files
}

#[tokio::test]
async fn test_export_writes_attachment_to_item_directory() {
    let tmp = tempdir().unwrap();
    let test_item = item("test123-abc", "Test Item", vec![attachment("att123", "test.txt")]);

    let mut api = serving(vec![test_item]);
    api.expect_download_attachment()
        .withf(|item_id, attachment_id| item_id == "test123-abc" && attachment_id == "att123")
        .times(1)
        .returning(|_, _| Ok(body(b"test content")));

    let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
    let report = exporter.export_all().await.expect("export should succeed");

    let written = tmp.path().join("Test Item_test123").join("test.txt");
    assert_eq!(fs::read(&written).unwrap(), b"test content");
    assert_eq!(report.items_exported, 1);
    assert_eq!(report.attachments_saved, 1);
    assert_eq!(report.bytes_written, 12);
    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
}

#[tokio::test]
async fn test_pagination_stops_at_first_empty_page() {
    let tmp = tempdir().unwrap();
    let mut api = MockHomeboxApi::new();
    logged_in(&mut api);

    // Pages 1..=3 carry one item each; page 4 is empty.
    api.expect_list_items()
        .times(4)
        .returning(|page_no, page_size| {
            assert_eq!(page_size, 25);
            if page_no <= 3 {
                Ok(page(vec![item(&format!("item{page_no}-x"), "Thing", vec![])]))
            } else {
                Ok(PaginationResult::default())
            }
        });
    api.expect_get_item()
        .times(3)
        .returning(|id| Ok(item(id, "Thing", vec![])));

    let mut cfg = config(tmp.path());
    cfg.page_size = 25;
    let exporter = Exporter::new(cfg, api, TracingReporter).unwrap();
    let report = exporter.export_all().await.expect("export should succeed");

    assert_eq!(report.pages, 3);
    assert_eq!(report.items_exported, 3);
    // Items without attachments still get their directory.
    for n in 1..=3 {
        assert!(tmp.path().join(format!("Thing_item{n}")).is_dir());
    }
}

#[tokio::test]
async fn test_zero_page_size_falls_back_to_default() {
    let tmp = tempdir().unwrap();
    let mut api = MockHomeboxApi::new();
    logged_in(&mut api);
    api.expect_list_items()
        .withf(|page_no, page_size| *page_no == 1 && *page_size == 100)
        .times(1)
        .returning(|_, _| Ok(PaginationResult::default()));

    let mut cfg = config(tmp.path());
    cfg.page_size = 0;
    let exporter = Exporter::new(cfg, api, TracingReporter).unwrap();
    let report = exporter.export_all().await.unwrap();
    assert_eq!(report.pages, 0);
}

#[tokio::test]
async fn test_detail_fetch_failure_is_isolated() {
    let tmp = tempdir().unwrap();
    let good_a = item("good-a", "Alpha", vec![attachment("a1", "a.txt")]);
    let bad = item("bad-1", "Broken", vec![attachment("b1", "b.txt")]);
    let good_c = item("good-c", "Gamma", vec![attachment("c1", "c.txt")]);

    let mut api = MockHomeboxApi::new();
    logged_in(&mut api);
    let listing = vec![good_a.clone(), bad.clone(), good_c.clone()];
    api.expect_list_items().returning(move |page_no, _| {
        if page_no == 1 {
            Ok(page(listing.clone()))
        } else {
            Ok(PaginationResult::default())
        }
    });
    let details = vec![good_a, good_c];
    api.expect_get_item().returning(move |id| {
        details
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 500,
                body: "boom".to_string(),
            })
    });
    api.expect_download_attachment()
        .times(2)
        .returning(|_, _| Ok(body(b"data")));

    let mut reporter = MockExportReporter::new();
    reporter.expect_item_exported().times(2).return_const(());
    reporter.expect_attachment_saved().times(2).return_const(());
    reporter
        .expect_failure()
        .times(1)
        .withf(|f| {
            f.stage == FailureStage::DetailFetch
                && f.item_id == "bad-1"
                && f.item_name == "Broken"
                && f.attachment_id.is_none()
        })
        .return_const(());

    let exporter = Exporter::new(config(tmp.path()), api, reporter).unwrap();
    let report = exporter.export_all().await.expect("partial failure is not fatal");

    assert_eq!(report.items_exported, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_clean());
    assert_eq!(fs::read(tmp.path().join("Alpha_good").join("a.txt")).unwrap(), b"data");
    assert_eq!(fs::read(tmp.path().join("Gamma_good").join("c.txt")).unwrap(), b"data");
    assert!(!tmp.path().join("Broken_bad").exists());
}

#[tokio::test]
async fn test_download_failure_is_reported_and_remaining_attachments_continue() {
    let tmp = tempdir().unwrap();
    let multi = item(
        "multi-1",
        "Camera",
        vec![
            attachment("att-fail", "manual.pdf"),
            attachment("att-ok", "receipt.jpg"),
            attachment("att-midstream", "photo.png"),
        ],
    );

    let mut api = serving(vec![multi]);
    api.expect_download_attachment()
        .returning(|_, attachment_id| match attachment_id {
            "att-fail" => Err(ApiError::Status {
                status: 404,
                body: "not found".to_string(),
            }),
            "att-midstream" => Ok(stream::iter(vec![
                Ok(b"half".to_vec()),
                Err(ApiError::Transport("reset".to_string())),
            ])
            .boxed()),
            _ => Ok(body(b"jpeg bytes")),
        });

    let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
    let report = exporter.export_all().await.expect("download failures are not fatal");

    assert_eq!(report.items_exported, 1);
    assert_eq!(report.attachments_saved, 1);
    assert_eq!(report.failures.len(), 2);
    for f in &report.failures {
        assert_eq!(f.stage, FailureStage::Download);
        assert_eq!(f.item_id, "multi-1");
        assert_eq!(f.item_name, "Camera");
    }
    assert_eq!(report.failures[0].attachment_id.as_deref(), Some("att-fail"));
    assert_eq!(report.failures[1].attachment_id.as_deref(), Some("att-midstream"));
    assert!(report.failures[0].message.contains("404"));
    assert_eq!(
        fs::read(tmp.path().join("Camera_multi").join("receipt.jpg")).unwrap(),
        b"jpeg bytes"
    );
}

#[tokio::test]
async fn test_listing_failure_aborts_with_page_context() {
    let tmp = tempdir().unwrap();
    let mut api = MockHomeboxApi::new();
    logged_in(&mut api);
    api.expect_list_items().returning(|page_no, _| {
        if page_no == 1 {
            Ok(page(vec![item("one-1", "One", vec![])]))
        } else {
            Err(ApiError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    });
    api.expect_get_item().returning(|id| Ok(item(id, "One", vec![])));

    let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
    let err = exporter.export_all().await.unwrap_err();

    match err {
        ExportError::ListItems { page, source } => {
            assert_eq!(page, 2);
            assert!(matches!(source, ApiError::Status { status: 502, .. }));
        }
        other => panic!("expected ListItems error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_failure_aborts_before_listing() {
    let tmp = tempdir().unwrap();
    let mut api = MockHomeboxApi::new();
    api.expect_login().times(1).returning(|_, _| {
        Err(ApiError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        })
    });
    api.expect_list_items().never();

    let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
    let err = exporter.export_all().await.unwrap_err();

    assert!(matches!(err, ExportError::Login(_)), "got {err:?}");
    assert!(err.to_string().contains("failed to login"));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_any_call() {
    let tmp = tempdir().unwrap();
    // No expectations: any call on the mock would panic.
    let api = MockHomeboxApi::new();

    let mut cfg = config(tmp.path());
    cfg.username = String::new();
    let result = Exporter::new(cfg, api, TracingReporter);

    match result {
        Err(ExportError::Config(e)) => {
            assert_eq!(e, ConfigError::MissingUsername);
            assert_eq!(e.to_string(), "username is required");
        }
        Err(other) => panic!("expected config error, got {other:?}"),
        Ok(_) => panic!("expected config error, got an exporter"),
    }
}

#[tokio::test]
async fn test_export_root_is_created_when_missing() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("nested").join("backup");
    let mut api = MockHomeboxApi::new();
    logged_in(&mut api);
    api.expect_list_items()
        .returning(|_, _| Ok(PaginationResult::default()));

    let exporter = Exporter::new(config(&root), api, TracingReporter).unwrap();
    exporter.export_all().await.unwrap();

    assert!(root.is_dir());
}

#[tokio::test]
async fn test_rerun_overwrites_in_place() {
    let tmp = tempdir().unwrap();
    let items = vec![
        item("first-1", "Drill", vec![attachment("d1", "manual.pdf"), attachment("d2", "")]),
        item("second-2", "Saw: Circular", vec![attachment("s1", "receipt")]),
    ];

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let mut api = serving(items.clone());
        api.expect_download_attachment()
            .returning(|_, attachment_id| match attachment_id {
                "d1" => Ok(body(b"manual")),
                "d2" => Ok(body(b"unnamed")),
                _ => Ok(body(b"receipt")),
            });
        let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
        let report = exporter.export_all().await.unwrap();
        assert!(report.is_clean());
        snapshots.push(snapshot(tmp.path()));
    }

    assert_eq!(snapshots[0], snapshots[1]);
    let names: Vec<_> = snapshots[0].keys().cloned().collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("Drill_first").join("d2.bin"),
            PathBuf::from("Drill_first").join("manual.pdf"),
            PathBuf::from("Saw_ Circular_second").join("receipt.bin"),
        ]
    );
}

#[tokio::test]
async fn test_blocked_item_directory_is_isolated() {
    let tmp = tempdir().unwrap();
    // A regular file where the first item's directory should go.
    fs::write(tmp.path().join("Blocked_a"), b"in the way").unwrap();

    let mut api = serving(vec![
        item("a-1", "Blocked", vec![attachment("x", "x.txt")]),
        item("b-2", "Ok", vec![attachment("y", "y")]),
    ]);
    api.expect_download_attachment()
        .withf(|item_id, _| item_id == "b-2")
        .times(1)
        .returning(|_, _| Ok(body(b"fine")));

    let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
    let report = exporter.export_all().await.expect("directory failures are not fatal");

    assert_eq!(report.items_exported, 1);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.stage, FailureStage::CreateDirectory);
    assert_eq!(failure.item_id, "a-1");
    assert_eq!(failure.attachment_id, None);
    assert_eq!(fs::read(tmp.path().join("Ok_b").join("y.bin")).unwrap(), b"fine");
}

#[tokio::test]
async fn test_uncreatable_attachment_file_is_a_write_failure() {
    let tmp = tempdir().unwrap();
    // A directory occupying the attachment's target path.
    fs::create_dir_all(tmp.path().join("Scanner_s").join("manual.pdf")).unwrap();

    let mut api = serving(vec![item(
        "s-1",
        "Scanner",
        vec![attachment("m", "manual.pdf"), attachment("r", "receipt.txt")],
    )]);
    api.expect_download_attachment()
        .times(2)
        .returning(|_, _| Ok(body(b"bytes")));

    let exporter = Exporter::new(config(tmp.path()), api, TracingReporter).unwrap();
    let report = exporter.export_all().await.expect("write failures are not fatal");

    assert_eq!(report.items_exported, 1);
    assert_eq!(report.attachments_saved, 1);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.stage, FailureStage::Write);
    assert_eq!(failure.attachment_id.as_deref(), Some("m"));
    assert!(failure.message.contains("manual.pdf"), "{}", failure.message);
    assert_eq!(
        fs::read(tmp.path().join("Scanner_s").join("receipt.txt")).unwrap(),
        b"bytes"
    );
}
