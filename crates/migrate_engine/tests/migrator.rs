use std::fs;
use std::sync::Arc;

use encoding_rs::EUC_KR;
use migrate_engine::{
    BoardTarget, FetchSettings, MigrationConfig, Migrator, PageTarget, ReqwestFetcher, TargetKind,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEGACY_PAGE: &str = r#"<html><head><title>인사말</title><script>alert(1)</script></head>
<body>
<div class="layout_head"><img src="/img/logo.png" alt="홈페이지 로고"></div>
<div id="content">
  <div class="s_location"><img src="/img/btnHome.gif"> 홈 &gt; 소개</div>
  <h3>인사말</h3>
  <p>한울자리에 오신 것을 환영합니다.</p>



  <p><a href="javascript:window.print()">인쇄하기</a></p>
  <p><img src="/files/greeting.jpg" width="640" height="480"></p>
  <div><span></span></div>
  <p class="copy">Skin By WebEngine</p>
</div>
<footer>copyright</footer>
</body></html>"#;

fn migrator(server: &MockServer, temp: &TempDir) -> (Migrator, MigrationConfig) {
    let mut config = MigrationConfig::for_site(Url::parse(&server.uri()).unwrap(), temp.path());
    config.fetch = FetchSettings {
        max_attempts: 1,
        ..FetchSettings::default()
    };
    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
    (Migrator::new(config.clone(), fetcher), config)
}

async fn mount(server: &MockServer, at: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn legacy_page_becomes_clean_fragment() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let (bytes, _, _) = EUC_KR.encode(LEGACY_PAGE);
    mount(
        &server,
        "/sub06",
        ResponseTemplate::new(200).set_body_raw(bytes.into_owned(), "text/html; charset=euc-kr"),
    )
    .await;
    mount(
        &server,
        "/files/greeting.jpg",
        ResponseTemplate::new(200).set_body_raw(b"jpeg-bytes".to_vec(), "image/jpeg"),
    )
    .await;

    let (migrator, config) = migrator(&server, &temp);
    let report = migrator
        .run(&[PageTarget::new("sub06", format!("{}/sub06", server.uri()))], &[])
        .await
        .unwrap();
    assert_eq!(report.failures().count(), 0);

    let html = fs::read_to_string(config.fragments_dir.join("sub06.html")).unwrap();
    assert!(html.contains("<h3>인사말</h3>"), "{html}");
    assert!(html.contains("<span>인쇄하기</span>"));
    assert!(html.contains(r#"src="/images/imported/greeting_"#));
    assert!(html.contains(r#"loading="lazy""#));
    assert!(!html.contains("width="));
    assert!(!html.contains("btnHome"));
    assert!(!html.contains("<script"));
    assert!(!html.contains("Skin By WebEngine"));
    assert!(!html.contains("<span></span>"));
    assert!(!html.contains("\n\n\n"));
    assert!(!html.contains("copyright"));
    assert_eq!(report.assets_written, 1);
}

#[tokio::test]
async fn failing_target_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount(&server, "/sub07", ResponseTemplate::new(500)).await;
    mount(
        &server,
        "/sub02",
        ResponseTemplate::new(200)
            .set_body_raw("<html><body><article>소개 페이지</article></body></html>", "text/html"),
    )
    .await;
    mount(
        &server,
        "/data",
        ResponseTemplate::new(200).set_body_raw(
            r#"<html><body><a href="/data/501">행사 사진</a></body></html>"#,
            "text/html; charset=utf-8",
        ),
    )
    .await;
    mount(
        &server,
        "/data/501",
        ResponseTemplate::new(200).set_body_raw(
            "<html><body><article>사진 모음</article></body></html>",
            "text/html; charset=utf-8",
        ),
    )
    .await;

    let (migrator, config) = migrator(&server, &temp);
    let pages = [
        PageTarget::new("sub07", format!("{}/sub07", server.uri())),
        PageTarget::new("sub02", format!("{}/sub02", server.uri())),
    ];
    let boards = [BoardTarget::new("data", format!("{}/data", server.uri()))];
    let report = migrator.run(&pages, &boards).await.unwrap();

    assert_eq!(report.targets.len(), 3);
    let failed: Vec<&str> = report.failures().map(|t| t.fragment_name.as_str()).collect();
    assert_eq!(failed, vec!["sub07"]);
    assert_eq!(report.succeeded(), 2);

    assert!(!config.fragments_dir.join("sub07.html").exists());
    assert_eq!(
        fs::read_to_string(config.fragments_dir.join("sub02.html")).unwrap(),
        "소개 페이지"
    );

    let board = report
        .targets
        .iter()
        .find(|t| t.kind == TargetKind::Board)
        .unwrap();
    assert_eq!(board.result.as_ref().unwrap().items, Some(1));
    let board_html = fs::read_to_string(config.fragments_dir.join("data.html")).unwrap();
    assert!(board_html.contains("<h2>행사 사진</h2>"));
    assert!(board_html.contains("사진 모음"));
}

#[tokio::test]
async fn spammy_standalone_page_is_still_saved() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount(
        &server,
        "/ham",
        ResponseTemplate::new(200).set_body_raw(
            "<html><body><div class=\"contents\">성인 교육 프로그램 안내</div></body></html>",
            "text/html; charset=utf-8",
        ),
    )
    .await;

    let (migrator, config) = migrator(&server, &temp);
    let report = migrator
        .run(&[PageTarget::new("ham", format!("{}/ham", server.uri()))], &[])
        .await
        .unwrap();

    let outcome = report.targets[0].result.as_ref().unwrap();
    assert!(outcome.spam_flagged);
    assert!(config.fragments_dir.join("ham.html").exists());
}

#[tokio::test]
async fn rerun_overwrites_fragments_and_reuses_assets() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount(
        &server,
        "/sub09_02",
        ResponseTemplate::new(200).set_body_raw(
            r#"<html><body><div class="main_content"><p>지도</p><img src="/map.png"></div></body></html>"#,
            "text/html; charset=utf-8",
        ),
    )
    .await;
    mount(
        &server,
        "/map.png",
        ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"),
    )
    .await;

    let pages = [PageTarget::new("sub09_02", format!("{}/sub09_02", server.uri()))];
    let (first, config) = migrator(&server, &temp);
    first.run(&pages, &[]).await.unwrap();
    let before = fs::read_to_string(config.fragments_dir.join("sub09_02.html")).unwrap();

    let (second, _) = migrator(&server, &temp);
    let report = second.run(&pages, &[]).await.unwrap();
    let after = fs::read_to_string(config.fragments_dir.join("sub09_02.html")).unwrap();

    assert_eq!(before, after);
    assert_eq!(report.assets_written, 0);
    assert_eq!(fs::read_dir(&config.images_dir).unwrap().count(), 1);
}
