//! Integration tests for the share workflow.
//!
//! These tests drive the public `ShareService` API end to end: creating links,
//! resolving them on the originating device (file-backed cache) and on a
//! "second device" with an empty store, and expiring cached content with a
//! manually controlled clock.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use qrshare_core::cache::STORE_KEY;
use qrshare_core::codec::PARAM_CONTENT;
use qrshare_core::content::{EmbedProvider, Playback};
use qrshare_core::id::RandomIdGenerator;
use qrshare_core::resolver::Tier;
use qrshare_core::share::ViewBody;
use qrshare_core::{
    Clock, ContentCodec, ContentId, ContentItem, ContentKind, ContentPayload, Expiration,
    ExpiringCache, FileStore, KeyValueStore, ManualClock, MemoryStore, ShareError, ShareQuery,
    ShareService, SharedView, VideoFileReader,
};
use url::Url;

const BASE_URL: &str = "https://share.example.com/";

type Service<S> = ShareService<S, RandomIdGenerator<ManualClock>, ManualClock>;

/// Test fixture holding a file-backed service and its clock.
struct ShareFixture {
    _dir: tempfile::TempDir,
    store_path: PathBuf,
    clock: ManualClock,
    service: Service<FileStore>,
}

impl ShareFixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("data").join("store.json");
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let service = file_service(&store_path, &clock, 1);

        Self {
            _dir: dir,
            store_path,
            clock,
            service,
        }
    }

    /// A second service over the same store file, as after a restart.
    fn reopen(&self) -> Service<FileStore> {
        file_service(&self.store_path, &self.clock, 2)
    }
}

fn file_service(path: &Path, clock: &ManualClock, seed: u64) -> Service<FileStore> {
    let store = FileStore::open(path, None).unwrap();
    ShareService::with_parts(
        Url::parse(BASE_URL).unwrap(),
        ExpiringCache::with_clock(store, clock.clone()),
        RandomIdGenerator::seeded(seed, clock.clone()),
    )
}

/// A service with an empty in-memory store, standing in for another device.
fn other_device() -> Service<MemoryStore> {
    let clock = ManualClock::new(Utc::now());
    ShareService::with_parts(
        Url::parse(BASE_URL).unwrap(),
        ExpiringCache::with_clock(MemoryStore::new(), clock.clone()),
        RandomIdGenerator::seeded(99, clock),
    )
}

fn text_body(view: &SharedView) -> Option<&str> {
    match &view.body {
        ViewBody::Text { body } => Some(body),
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_short_text_resolves_inline_without_cache(
        text in "[a-zA-Z0-9][a-zA-Z0-9 .,!?&=+%#/éü\n]{0,498}[a-zA-Z0-9]"
    ) {
        let mut fixture = ShareFixture::new();
        let outcome = fixture.service.share_text(&text, Expiration::Never).unwrap();
        prop_assert!(outcome.link.inline);

        let decoded = ContentCodec::default()
            .decode(&ShareQuery::parse(&outcome.link.url))
            .unwrap()
            .unwrap();
        prop_assert_eq!(decoded.kind(), ContentKind::Text);
        prop_assert_eq!(&decoded, outcome.item.payload());

        let view = other_device().open(&outcome.link.url);
        prop_assert_eq!(view.tier, Some(Tier::Inline));
        prop_assert_eq!(text_body(&view), Some(text.as_str()));
    }
}

#[test]
fn test_text_at_limit_inline_one_over_cache_only() {
    let mut fixture = ShareFixture::new();

    let at_limit = fixture
        .service
        .share_text(&"é".repeat(500), Expiration::Never)
        .unwrap();
    assert!(at_limit.link.inline);

    let over_limit = fixture
        .service
        .share_text(&"é".repeat(501), Expiration::Never)
        .unwrap();
    assert!(!over_limit.link.inline);
}

#[test]
fn test_long_text_link_omits_payload_and_needs_cache() {
    let mut fixture = ShareFixture::new();
    let text = "long ".repeat(200);
    let outcome = fixture.service.share_text(&text, Expiration::Days(7)).unwrap();

    let query = ShareQuery::parse(&outcome.link.url);
    assert_eq!(query.param(PARAM_CONTENT), None);
    assert_eq!(query.param("text"), None);
    assert_eq!(query.id(), Some(outcome.item.id().as_str()));

    assert_eq!(other_device().open(&outcome.link.url), SharedView::not_found());

    let view = fixture.reopen().open(&outcome.link.url);
    assert_eq!(view.tier, Some(Tier::Cache));
    assert_eq!(text_body(&view), Some(text.trim()));
    assert_eq!(view.shared_at.as_deref(), Some("2024-05-01 12:00:00 UTC"));
    assert_eq!(view.expiry_info, "Expires on 2024-05-08 12:00:00 UTC");
}

#[test]
fn test_expired_entry_pruned_by_next_put() {
    let fixture = ShareFixture::new();
    let store = FileStore::open(&fixture.store_path, None).unwrap();
    let mut cache = ExpiringCache::with_clock(store, fixture.clock.clone());

    let now = fixture.clock.now();
    let stale = ContentItem::new(
        ContentId::parse("stale1").unwrap(),
        ContentPayload::Text("old news".to_string()),
        now - Duration::days(2),
        Some(now - Duration::seconds(1)),
    )
    .unwrap();
    cache.put(&stale).unwrap();

    let fresh = ContentItem::with_expiration(
        ContentId::parse("fresh1").unwrap(),
        ContentPayload::Text("new".to_string()),
        now,
        Expiration::Never,
    )
    .unwrap();
    cache.put(&fresh).unwrap();

    assert_eq!(cache.get(stale.id()).unwrap(), None);
    assert_eq!(cache.stored_len().unwrap(), 1);

    let raw = std::fs::read_to_string(&fixture.store_path).unwrap();
    assert!(!raw.contains("stale1"));
}

#[test]
fn test_put_then_get_deep_equal_across_reopen() {
    let fixture = ShareFixture::new();
    let now = fixture.clock.now();
    let items = [
        ContentItem::with_expiration(
            ContentId::parse("future").unwrap(),
            ContentPayload::Text("kept for a week".to_string()),
            now,
            Expiration::Days(7),
        )
        .unwrap(),
        ContentItem::with_expiration(
            ContentId::parse("forever").unwrap(),
            ContentPayload::video_url("https://vimeo.com/76979871").unwrap(),
            now,
            Expiration::Never,
        )
        .unwrap(),
    ];

    {
        let store = FileStore::open(&fixture.store_path, None).unwrap();
        let mut cache = ExpiringCache::with_clock(store, fixture.clock.clone());
        for item in &items {
            cache.put(item).unwrap();
        }
    }

    let store = FileStore::open(&fixture.store_path, None).unwrap();
    let cache = ExpiringCache::with_clock(store, fixture.clock.clone());
    for item in &items {
        assert_eq!(cache.get(item.id()).unwrap().as_ref(), Some(item));
    }
}

#[test]
fn test_unknown_and_expired_ids_same_view() {
    let mut fixture = ShareFixture::new();
    let outcome = fixture
        .service
        .share_text(&"expiring ".repeat(80), Expiration::Days(1))
        .unwrap();
    assert!(!outcome.link.inline);

    fixture.clock.advance(Duration::days(1));

    let expired = fixture.service.open(&outcome.link.url);
    let unknown = fixture.service.open("https://share.example.com/?id=0000000000");

    assert_eq!(expired, unknown);
    assert_eq!(expired, SharedView::not_found());
    assert_eq!(
        expired.to_string(),
        "This content has expired or does not exist."
    );
}

#[test]
fn test_video_urls_embed_or_play_directly() {
    let mut fixture = ShareFixture::new();
    let cases = [
        (
            "https://www.youtube.com/watch?v=ABC123",
            Some((EmbedProvider::Youtube, "https://www.youtube.com/embed/ABC123")),
        ),
        (
            "https://youtu.be/XYZ789",
            Some((EmbedProvider::Youtube, "https://www.youtube.com/embed/XYZ789")),
        ),
        (
            "https://vimeo.com/76979871",
            Some((EmbedProvider::Vimeo, "https://player.vimeo.com/video/76979871")),
        ),
        ("https://cdn.example.com/clip.mp4", None),
    ];

    for (url, expected) in cases {
        let outcome = fixture.service.share_video_url(url, Expiration::Never).unwrap();
        assert!(outcome.link.inline, "video URLs always travel in the link");

        let view = other_device().open(&outcome.link.url);
        let ViewBody::Video { playback } = view.body else {
            panic!("expected a video view for {url}");
        };

        match expected {
            Some((provider, embed_url)) => assert_eq!(
                playback,
                Playback::Embed {
                    provider,
                    embed_url: embed_url.to_string(),
                }
            ),
            None => assert_eq!(
                playback,
                Playback::Direct {
                    src: url.to_string()
                }
            ),
        }
    }
}

#[test]
fn test_invalid_inputs_rejected_as_user_errors() {
    let mut fixture = ShareFixture::new();

    let empty = fixture.service.share_text("  ", Expiration::Never).unwrap_err();
    let bad_url = fixture
        .service
        .share_video_url("not a url", Expiration::Never)
        .unwrap_err();

    for error in [empty, bad_url] {
        assert!(matches!(error, ShareError::Validation(_)));
        assert!(error.is_user_error());
    }
}

#[tokio::test]
async fn test_video_file_shared_through_cache_only() {
    let mut fixture = ShareFixture::new();
    let video_path = fixture.store_path.with_file_name("clip.webm");
    std::fs::File::create(&video_path)
        .unwrap()
        .write_all(b"webm bytes")
        .unwrap();

    let pending = fixture.service.begin_video_file(&video_path, None).unwrap();
    let outcome = fixture
        .service
        .complete_video_file(pending, Expiration::Days(1))
        .await
        .unwrap()
        .unwrap();

    assert!(!outcome.link.inline);
    assert!(outcome.link.url.contains("type=video&source=file"));

    let view = fixture.reopen().open(&outcome.link.url);
    match view.body {
        ViewBody::Video {
            playback: Playback::Direct { src },
        } => assert!(src.starts_with("data:video/webm;base64,")),
        other => panic!("expected direct playback, got {other:?}"),
    }

    assert!(!other_device().open(&outcome.link.url).is_found());
}

#[tokio::test]
async fn test_video_file_over_limit_rejected_before_read() {
    let mut fixture = ShareFixture::new();
    fixture.service = fixture
        .reopen()
        .with_reader(VideoFileReader::new(8));

    let video_path = fixture.store_path.with_file_name("big.mp4");
    std::fs::write(&video_path, vec![0u8; 64]).unwrap();

    let error = fixture
        .service
        .begin_video_file(&video_path, None)
        .unwrap_err();
    assert!(error.is_user_error());
    assert!(error.user_message().contains("8 byte"));
}

#[test]
fn test_unversioned_store_document_still_resolves() {
    let fixture = ShareFixture::new();
    let legacy = r#"[{"id":"legacy1","type":"text","data":"from an older build","created":"2024-04-30T08:00:00Z","expires":null}]"#;

    let mut store = FileStore::open(&fixture.store_path, None).unwrap();
    store.write(STORE_KEY, legacy).unwrap();

    let view = fixture.reopen().open("?id=legacy1");
    assert_eq!(text_body(&view), Some("from an older build"));
    assert_eq!(view.expiry_info, "Never expires");
}

#[test]
fn test_storage_quota_failure_only_fatal_for_cache_only_links() {
    let clock = ManualClock::new(Utc::now());
    let mut service = ShareService::with_parts(
        Url::parse(BASE_URL).unwrap(),
        ExpiringCache::with_clock(MemoryStore::with_quota(32), clock.clone()),
        RandomIdGenerator::seeded(5, clock),
    );

    let inline = service.share_text("short", Expiration::Never).unwrap();
    assert!(inline.storage_warning.is_some());
    assert_eq!(
        text_body(&other_device().open(&inline.link.url)),
        Some("short")
    );

    let error = service
        .share_text(&"z".repeat(501), Expiration::Never)
        .unwrap_err();
    assert!(matches!(error, ShareError::Storage(ref e) if e.is_quota_exceeded()));
}
