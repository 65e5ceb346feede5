//! End-to-end crawl over HTTP against a local mock server.

use std::sync::Arc;
use std::time::Duration;
use trace_crawler::client::{ReqwestTransport, RetryPolicy, RetryingClient};
use trace_crawler::config::{CrawlerConfig, TransportConfig};
use trace_crawler::discovery::{
    HeadingTitleDiscoverer, HeuristicLinkDiscoverer, LinkHeuristic, TraceBootstrapper,
};
use trace_crawler::models::{Article, Source, TraceKind, TraceSet};
use trace_crawler::orchestrator::{Orchestrator, RunState};
use trace_crawler::outputs::json;
use trace_crawler::store::{FileTraceStore, MemoryTraceStore, TraceStore};
use trace_crawler::trace::Trace;
use trace_crawler::CrawlError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn trace(tags: &[&str]) -> Trace {
    Trace::new(tags.iter().map(|t| t.to_string()).collect()).unwrap()
}

fn fast_client() -> RetryingClient<ReqwestTransport> {
    let transport = ReqwestTransport::new(&TransportConfig {
        timeout_secs: Some(5),
        user_agent: Some("trace_crawler-tests".to_string()),
    })
    .unwrap();
    RetryingClient::new(
        transport,
        RetryPolicy {
            max_attempts: 3,
            backoff_factor: 0.01,
            max_backoff_wait: Duration::from_millis(100),
        },
    )
}

fn listing_html(base: &str) -> String {
    format!(
        r#"<html><head><style>a {{ color: red }}</style></head><body>
            <a href="{base}/story-1">Story one</a>
            <div><a href="{base}/story-2">Story two</a></div>
            <section><ul><li><a href="{base}/elsewhere">Elsewhere</a></li></ul></section>
            <footer><a href="{base}/about">About</a></footer>
        </body></html>"#
    )
}

fn article_html(title: &str) -> String {
    format!(
        "<html><body><header><h1>Mock News</h1></header><main><h1>{title}</h1><p>Text.</p></main></body></html>"
    )
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn run_returns_articles_for_both_link_shapes() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", listing_html(&base)).await;
    mount_page(&server, "/story-1", article_html("Story one")).await;
    mount_page(&server, "/elsewhere", article_html("Should not be fetched")).await;

    // story-2 fails once with a retryable status before succeeding
    Mock::given(method("GET"))
        .and(path("/story-2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/story-2", article_html("Story two")).await;

    let source = Source::new("Mock News", &base);
    let store = Arc::new(
        MemoryTraceStore::with_sets([
            TraceSet::new(
                source.id.clone(),
                TraceKind::ArticleLinks,
                vec![trace(&["body", "a"]), trace(&["body", "div", "a"])],
            ),
            TraceSet::new(
                source.id.clone(),
                TraceKind::ArticleTitle,
                vec![trace(&["body", "main", "h1"])],
            ),
        ])
        .unwrap(),
    );

    let orchestrator =
        Orchestrator::new(source, store, fast_client(), &CrawlerConfig::default()).unwrap();
    let articles = orchestrator.run(&format!("{base}/")).await.unwrap();

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Story one", "Story two"]);
    assert_eq!(orchestrator.state(), RunState::Done);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/elsewhere"));
    assert!(requests.iter().all(|r| r.url.path() != "/about"));
    assert_eq!(
        requests.iter().filter(|r| r.url.path() == "/story-2").count(),
        2
    );
}

#[tokio::test]
async fn listing_failure_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = Source::new("Mock News", &server.uri());
    let store = Arc::new(MemoryTraceStore::new());
    let orchestrator =
        Orchestrator::new(source, store, fast_client(), &CrawlerConfig::default()).unwrap();

    let err = orchestrator
        .run(&format!("{}/", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::TerminalHttp { status: 404, .. }));
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn discover_then_crawl_with_file_store() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        format!(
            r#"<body><nav><ul><li><a href="{base}/home">Home</a></li></ul></nav>
               <main><ul>
                 <li><a href="{base}/s1">One</a></li>
                 <li><a href="{base}/s2">Two</a></li>
               </ul></main></body>"#
        ),
    )
    .await;
    mount_page(&server, "/s1", article_html("First")).await;
    mount_page(&server, "/s2", article_html("Second")).await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("traces.yaml");
    let store = Arc::new(FileTraceStore::open(&store_path).await.unwrap());
    let client = fast_client();
    let source = Source::new("Mock News", &base);
    let listing = format!("{base}/");

    let bootstrapper = TraceBootstrapper::new(Arc::clone(&store), client.clone());
    let links = bootstrapper
        .ensure_traces(
            &source,
            TraceKind::ArticleLinks,
            &listing,
            &HeuristicLinkDiscoverer::new(LinkHeuristic::InsideListItem),
        )
        .await
        .unwrap();
    assert_eq!(links.traces, vec![trace(&["body", "main", "ul", "li", "a"])]);

    let orchestrator = Orchestrator::new(
        source.clone(),
        Arc::clone(&store),
        client,
        &CrawlerConfig::default(),
    )
    .unwrap();
    let first = orchestrator.get_article_links(&listing).await.unwrap()[0].clone();
    bootstrapper
        .ensure_traces(&source, TraceKind::ArticleTitle, &first, &HeadingTitleDiscoverer)
        .await
        .unwrap();

    let articles = orchestrator.run(&listing).await.unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].title, "First");

    // traces persisted and readable from a fresh store
    store.flush().await.unwrap();
    let reopened = FileTraceStore::open(&store_path).await.unwrap();
    let title = reopened
        .read_by_and_type(&source.id, TraceKind::ArticleTitle)
        .await
        .unwrap();
    assert_eq!(title.traces, vec![trace(&["body", "main", "h1"])]);

    let out = json::write_articles(dir.path().join("json"), orchestrator.domain().unwrap(), &articles)
        .await
        .unwrap();
    let written: Vec<Article> =
        serde_json::from_str(&tokio::fs::read_to_string(out).await.unwrap()).unwrap();
    assert_eq!(written, articles);
}
