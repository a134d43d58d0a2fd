//! Integration tests for the crawl engine
//!
//! Most tests drive the full crawl over an in-memory catalog so every layout,
//! retry path and concurrency bound can be scripted. The last group checks
//! the static HTTP probe against wiremock.

use catalog_ripple::config::{parse_config, Config};
use catalog_ripple::crawler::{
    crawl, MenuRoots, NodeEvent, Scheduler, SchedulerSettings, StaticRoots,
};
use catalog_ripple::output::{export_sections, write_reports, RowKind, NO_CHILDREN_LABEL};
use catalog_ripple::probe::{
    HttpProbeFactory, Marker, MemoryEntry, MemoryPage, MemorySite, PageLayout, PageProbe,
    ProbeFactory,
};
use catalog_ripple::tree::LeafReason;
use catalog_ripple::{
    CategoryNode, CrawlReport, NodeError, NodeStatus, ProbeError, RippleError, StrategyKind,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration with the given roots
fn create_test_config(roots: &[(&str, &str)], excluded: &[&str]) -> Config {
    let mut toml = String::from(
        r#"
[crawler]
workers = 2
max-attempts = 3
retry-delay-ms = 1
retry-max-delay-ms = 5
navigation-timeout-ms = 200
node-timeout-ms = 2000
probe-wait-ms = 5
progress-every = 1

[poll]
interval-ms = 1
stable-reads = 2
max-polls = 20

[output]
report-path = "report.md"

[site]
base-url = "https://shop.example"
"#,
    );

    let excluded: Vec<String> = excluded.iter().map(|n| format!("\"{}\"", n)).collect();
    toml.push_str(&format!("excluded-roots = [{}]\n", excluded.join(", ")));

    for (name, url) in roots {
        toml.push_str(&format!(
            "\n[[site.root]]\nname = \"{}\"\nurl = \"{}\"\n",
            name, url
        ));
    }

    parse_config(&toml).expect("test config must be valid")
}

async fn run(config: &Config, site: &MemorySite) -> CrawlReport {
    let listing = StaticRoots::from_config(&config.site);
    crawl(config, Arc::new(site.clone()), &listing)
        .await
        .expect("crawl should complete")
}

fn names(nodes: &[CategoryNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

/// A catalog using every layout the classifier knows
fn mixed_layout_site() -> MemorySite {
    MemorySite::builder()
        .layout(
            "/shoes",
            PageLayout::MenuA(vec![
                MemoryEntry::link("Sneakers", "/shoes/sneakers"),
                MemoryEntry::link("Boots", "/shoes/boots"),
            ]),
        )
        .layout(
            "/shoes/sneakers",
            PageLayout::MenuB(vec![
                MemoryEntry::Header("Popular".into()),
                MemoryEntry::link("Running", "/shoes/sneakers/running"),
                MemoryEntry::Unlinked("Coming soon".into()),
                MemoryEntry::link("Court", "/shoes/sneakers/court"),
            ]),
        )
        .layout("/shoes/sneakers/running", PageLayout::Blank)
        .layout("/shoes/sneakers/court", PageLayout::Blank)
        .layout(
            "/shoes/boots",
            PageLayout::FlatFilter {
                labels: vec!["Chelsea".into(), "Hiking".into(), "Rain".into()],
                batch: 1,
            },
        )
        .layout(
            "/home",
            PageLayout::Burger {
                entries: vec![
                    MemoryEntry::link("Kitchen", "/home/kitchen"),
                    MemoryEntry::link("Garden", "/home/garden"),
                ],
                batch: 1,
            },
        )
        .layout("/home/kitchen", PageLayout::Blank)
        .layout("/home/garden", PageLayout::Blank)
        .layout("/gifts", PageLayout::Blank)
        .build()
}

fn mixed_layout_config() -> Config {
    create_test_config(
        &[("Shoes", "/shoes"), ("Home", "/home"), ("Gifts", "/gifts")],
        &[],
    )
}

#[tokio::test]
async fn test_full_crawl_mixed_layouts() {
    let site = mixed_layout_site();
    let report = run(&mixed_layout_config(), &site).await;

    assert_eq!(names(&report.roots), vec!["Shoes", "Home", "Gifts"]);

    let shoes = report.find(&["Shoes"]).unwrap();
    assert_eq!(shoes.status, NodeStatus::Expanded);
    assert_eq!(shoes.strategy, Some(StrategyKind::NestedMenuA));
    assert_eq!(names(&shoes.children), vec!["Sneakers", "Boots"]);

    let sneakers = report.find(&["Shoes", "Sneakers"]).unwrap();
    assert_eq!(sneakers.strategy, Some(StrategyKind::NestedMenuB));
    assert_eq!(names(&sneakers.children), vec!["Running", "Court"]);

    let running = report.find(&["Shoes", "Sneakers", "Running"]).unwrap();
    assert_eq!(running.status, NodeStatus::NoChildren);
    assert_eq!(running.leaf_reason, Some(LeafReason::NoStructure));
    assert_eq!(running.depth, 3);
    assert_eq!(running.parent_path, vec!["Shoes", "Sneakers"]);

    let boots = report.find(&["Shoes", "Boots"]).unwrap();
    assert_eq!(boots.status, NodeStatus::Expanded);
    assert_eq!(boots.strategy, Some(StrategyKind::FlatFilterCategory));
    assert_eq!(
        boots.flat_categories.as_deref(),
        Some(&["Chelsea".to_string(), "Hiking".to_string(), "Rain".to_string()][..])
    );
    assert!(boots.children.is_empty());

    let home = report.find(&["Home"]).unwrap();
    assert_eq!(home.strategy, Some(StrategyKind::FilterBurgerList));
    assert_eq!(names(&home.children), vec!["Kitchen", "Garden"]);

    let gifts = report.find(&["Gifts"]).unwrap();
    assert_eq!(gifts.status, NodeStatus::NoChildren);

    assert_eq!(report.counts.pending, 0);
    assert_eq!(report.counts.failed, 0);
    assert_eq!(report.counts.total(), report.nodes().len());
}

#[tokio::test]
async fn test_scenario_menu_with_two_leaves() {
    let site = MemorySite::builder()
        .layout(
            "/shoes",
            PageLayout::MenuA(vec![
                MemoryEntry::link("Sneakers", "/shoes/sneakers"),
                MemoryEntry::link("Boots", "/shoes/boots"),
            ]),
        )
        .layout("/shoes/sneakers", PageLayout::Blank)
        .layout("/shoes/boots", PageLayout::Blank)
        .build();
    let config = create_test_config(&[("Shoes", "/shoes")], &[]);

    let report = run(&config, &site).await;

    let shoes = report.find(&["Shoes"]).unwrap();
    assert_eq!(names(&shoes.children), vec!["Sneakers", "Boots"]);
    assert!(shoes
        .children
        .iter()
        .all(|child| child.status == NodeStatus::NoChildren));

    let sections = export_sections(&report.roots, true);
    let rows = &sections[0].rows;
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row.level, 2);
        assert_eq!(row.path, "Shoes");
        assert_eq!(row.kind, RowKind::Category);
    }
}

#[tokio::test]
async fn test_scenario_flat_labels_keep_duplicates() {
    let site = MemorySite::builder()
        .layout(
            "/colors",
            PageLayout::FlatFilter {
                labels: vec!["Red".into(), "Blue".into(), "Red".into()],
                batch: 0,
            },
        )
        .build();
    let config = create_test_config(&[("Colors", "/colors")], &[]);

    let report = run(&config, &site).await;

    let colors = report.find(&["Colors"]).unwrap();
    assert_eq!(colors.status, NodeStatus::Expanded);
    assert_eq!(
        colors.flat_categories,
        Some(vec!["Red".to_string(), "Blue".to_string(), "Red".to_string()])
    );

    let sections = export_sections(&report.roots, false);
    let rows = &sections[0].rows;
    let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Red", "Blue", "Red"]);
    assert!(rows.iter().all(|r| r.path == "Colors" && r.kind == RowKind::Flat));
}

#[tokio::test]
async fn test_scenario_timeouts_exhaust_attempts() {
    let site = MemorySite::builder()
        .page("/slow", MemoryPage::new(PageLayout::Blank).timing_out())
        .build();
    let mut config = create_test_config(&[("Slow", "/slow")], &[]);
    config.crawler.navigation_timeout_ms = 10;

    let report = run(&config, &site).await;

    let slow = report.find(&["Slow"]).unwrap();
    assert_eq!(slow.status, NodeStatus::Failed);
    assert_eq!(slow.attempts, 3);
    assert_eq!(site.stats().navigations_to("/slow"), 3);

    let sections = export_sections(&report.roots, true);
    assert_eq!(sections[0].rows.len(), 1);
    assert_eq!(sections[0].rows[0].kind, RowKind::Failed);
    assert_eq!(sections[0].rows[0].label, "Slow");
}

#[tokio::test]
async fn test_tree_shape_invariants() {
    let site = mixed_layout_site();
    let report = run(&mixed_layout_config(), &site).await;

    for node in report.nodes() {
        assert!(node.status.is_terminal(), "{} left pending", node.name);
        assert_eq!(node.depth as usize, node.parent_path.len() + 1);

        for child in &node.children {
            assert_eq!(child.depth, node.depth + 1);
            assert_eq!(child.parent_path, node.path());
        }

        if node.status == NodeStatus::Expanded {
            let has_children = !node.children.is_empty();
            let has_flat = node
                .flat_categories
                .as_ref()
                .is_some_and(|labels| !labels.is_empty());
            assert!(
                has_children != has_flat,
                "{} must have exactly one kind of content",
                node.name
            );
        } else {
            assert!(node.children.is_empty());
            assert!(node.flat_categories.is_none());
        }
    }
}

#[tokio::test]
async fn test_each_page_visited_once() {
    let site = mixed_layout_site();
    run(&mixed_layout_config(), &site).await;

    let stats = site.stats();
    assert_eq!(stats.navigations.len(), 9);
    for (url, count) in &stats.navigations {
        assert_eq!(*count, 1, "{} navigated {} times", url, count);
    }
    assert_eq!(stats.open_sessions, 0);
}

#[tokio::test]
async fn test_cycle_is_not_followed() {
    let site = MemorySite::builder()
        .layout(
            "/shoes",
            PageLayout::MenuA(vec![
                MemoryEntry::link("All shoes", "/shoes/"),
                MemoryEntry::link("Boots", "/shoes/boots"),
            ]),
        )
        .layout(
            "/shoes/boots",
            PageLayout::MenuA(vec![MemoryEntry::link("Back", "/shoes?utm_source=menu")]),
        )
        .build();
    let config = create_test_config(&[("Shoes", "/shoes")], &[]);

    let report = run(&config, &site).await;

    let all = report.find(&["Shoes", "All shoes"]).unwrap();
    assert_eq!(all.status, NodeStatus::NoChildren);
    assert_eq!(all.leaf_reason, Some(LeafReason::CycleDetected));

    let back = report.find(&["Shoes", "Boots", "Back"]).unwrap();
    assert_eq!(back.leaf_reason, Some(LeafReason::CycleDetected));

    let stats = site.stats();
    assert_eq!(stats.navigations_to("/shoes"), 1);
    assert_eq!(stats.navigations_to("/shoes/"), 0);
    assert_eq!(stats.navigations_to("/shoes?utm_source=menu"), 0);
}

#[tokio::test]
async fn test_max_depth_keeps_deeper_nodes_as_leaves() {
    let site = mixed_layout_site();
    let mut config = mixed_layout_config();
    config.crawler.max_depth = Some(2);

    let report = run(&config, &site).await;

    let sneakers = report.find(&["Shoes", "Sneakers"]).unwrap();
    assert_eq!(sneakers.status, NodeStatus::Expanded);

    let running = report.find(&["Shoes", "Sneakers", "Running"]).unwrap();
    assert_eq!(running.status, NodeStatus::NoChildren);
    assert_eq!(running.leaf_reason, Some(LeafReason::DepthLimit));
    assert_eq!(running.attempts, 0);
    assert_eq!(site.stats().navigations_to("/shoes/sneakers/running"), 0);
}

#[tokio::test]
async fn test_sessions_bounded_by_worker_count() {
    let mut builder = MemorySite::builder();
    let mut roots = Vec::new();
    let urls: Vec<String> = (0..6).map(|i| format!("/dept/{}", i)).collect();
    for (i, url) in urls.iter().enumerate() {
        builder = builder.page(
            url,
            MemoryPage::new(PageLayout::MenuA(vec![MemoryEntry::link(
                "Sub",
                &format!("{}/sub", url),
            )]))
            .with_delay(Duration::from_millis(15)),
        );
        builder = builder.page(
            &format!("{}/sub", url),
            MemoryPage::new(PageLayout::Blank).with_delay(Duration::from_millis(15)),
        );
        roots.push((format!("Dept {}", i), url.clone()));
    }
    let site = builder.build();

    let root_refs: Vec<(&str, &str)> = roots
        .iter()
        .map(|(name, url)| (name.as_str(), url.as_str()))
        .collect();
    let config = create_test_config(&root_refs, &[]);

    let report = run(&config, &site).await;

    let stats = site.stats();
    assert_eq!(stats.peak_sessions, 2);
    assert!(report.peak_active <= 2);
    assert_eq!(stats.open_sessions, 0);
    assert_eq!(stats.sessions_opened, 12);
    assert_eq!(report.counts.expanded, 6);
    assert_eq!(report.counts.no_children, 6);
}

#[tokio::test]
async fn test_flaky_pages_recover_within_budget() {
    let site = MemorySite::builder()
        .page(
            "/flaky",
            MemoryPage::new(PageLayout::MenuA(vec![MemoryEntry::link("Leaf", "/leaf")]))
                .failing_first(2),
        )
        .page(
            "/lazy",
            MemoryPage::new(PageLayout::MenuB(vec![MemoryEntry::link("Leaf", "/leaf")]))
                .empty_first(1),
        )
        .layout("/leaf", PageLayout::Blank)
        .layout("/empty", PageLayout::MenuA(Vec::new()))
        .build();
    let config = create_test_config(
        &[("Flaky", "/flaky"), ("Lazy", "/lazy"), ("Empty", "/empty")],
        &[],
    );

    let report = run(&config, &site).await;

    let flaky = report.find(&["Flaky"]).unwrap();
    assert_eq!(flaky.status, NodeStatus::Expanded);
    assert_eq!(flaky.attempts, 3);

    let lazy = report.find(&["Lazy"]).unwrap();
    assert_eq!(lazy.status, NodeStatus::Expanded);
    assert_eq!(lazy.attempts, 2);

    let empty = report.find(&["Empty"]).unwrap();
    assert_eq!(empty.status, NodeStatus::NoChildren);
    assert_eq!(empty.leaf_reason, Some(LeafReason::EmptyExtraction));
    assert_eq!(empty.strategy, Some(StrategyKind::NestedMenuA));
    assert_eq!(empty.attempts, 3);
    assert_eq!(site.stats().navigations_to("/empty"), 3);
}

#[tokio::test]
async fn test_empty_extraction_not_retried_when_disabled() {
    let site = MemorySite::builder()
        .layout("/empty", PageLayout::MenuA(Vec::new()))
        .build();
    let mut config = create_test_config(&[("Empty", "/empty")], &[]);
    config.crawler.retry_empty_extraction = false;

    let report = run(&config, &site).await;

    let empty = report.find(&["Empty"]).unwrap();
    assert_eq!(empty.leaf_reason, Some(LeafReason::EmptyExtraction));
    assert_eq!(empty.attempts, 1);
}

#[tokio::test]
async fn test_exhausted_node_does_not_stop_siblings() {
    let site = MemorySite::builder()
        .layout(
            "/mixed",
            PageLayout::MenuA(vec![
                MemoryEntry::link("Slow", "/mixed/slow"),
                MemoryEntry::link("Fine", "/mixed/fine"),
                MemoryEntry::link("Gone", "/mixed/gone"),
            ]),
        )
        .page("/mixed/slow", MemoryPage::new(PageLayout::Blank).timing_out())
        .layout("/mixed/fine", PageLayout::Blank)
        .build();
    let mut config = create_test_config(&[("Mixed", "/mixed")], &[]);
    config.crawler.max_attempts = 2;
    config.crawler.navigation_timeout_ms = 20;

    let report = run(&config, &site).await;

    let slow = report.find(&["Mixed", "Slow"]).unwrap();
    assert_eq!(slow.status, NodeStatus::Failed);
    let failure = slow.failure.as_ref().unwrap();
    assert_eq!(failure.attempts, 2);
    assert_eq!(
        failure.cause,
        NodeError::PermanentNodeFailure {
            attempts: 2,
            cause: Box::new(NodeError::NavigationTimeout("/mixed/slow".into())),
        }
    );

    let gone = report.find(&["Mixed", "Gone"]).unwrap();
    assert_eq!(gone.status, NodeStatus::Failed);

    let fine = report.find(&["Mixed", "Fine"]).unwrap();
    assert_eq!(fine.status, NodeStatus::NoChildren);

    assert_eq!(report.counts.failed, 2);
    assert_eq!(report.counts.pending, 0);
    assert_eq!(site.stats().navigations_to("/mixed/slow"), 2);
    assert_eq!(site.stats().navigations_to("/mixed/fine"), 1);
}

#[tokio::test]
async fn test_all_roots_excluded_is_fatal() {
    let site = mixed_layout_site();
    let config = create_test_config(&[("Gift Cards", "/gifts")], &[" gift cards "]);

    let listing = StaticRoots::from_config(&config.site);
    let result = crawl(&config, Arc::new(site.clone()), &listing).await;

    assert!(matches!(result, Err(RippleError::EmptyRootListing)));
    assert!(site.stats().navigations.is_empty());
}

#[tokio::test]
async fn test_roots_read_from_main_menu() {
    let site = MemorySite::builder()
        .root_menu(vec![
            MemoryEntry::link(" Shoes ", "/shoes"),
            MemoryEntry::link("Gift Cards", "/gifts"),
            MemoryEntry::link("Gifts", "/gifts-2"),
        ])
        .layout(
            "/shoes",
            PageLayout::MenuA(vec![MemoryEntry::link("Boots", "/shoes/boots")]),
        )
        .layout("/shoes/boots", PageLayout::Blank)
        .layout("/gifts-2", PageLayout::Blank)
        .build();
    let config = create_test_config(&[], &["Gift Cards"]);
    let factory: Arc<dyn ProbeFactory> = Arc::new(site.clone());
    let listing = MenuRoots::new(
        Arc::clone(&factory),
        &config.markers,
        config.crawler.navigation_timeout(),
        config.crawler.probe_wait(),
    );

    let report = crawl(&config, factory, &listing).await.unwrap();

    assert_eq!(names(&report.roots), vec!["Shoes", "Gifts"]);
    assert!(report.find(&["Shoes", "Boots"]).is_some());
    assert_eq!(site.stats().navigations_to("/gifts"), 0);
    assert_eq!(site.stats().open_sessions, 0);
}

#[tokio::test]
async fn test_node_events_cover_every_expanded_node() {
    let site = mixed_layout_site();
    let config = mixed_layout_config();
    let listing = StaticRoots::from_config(&config.site);
    let roots = catalog_ripple::crawler::resolve_roots(&listing, &config.site.excluded_roots)
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = Scheduler::new(
        SchedulerSettings::from_config(&config).unwrap(),
        Arc::new(site),
    )
    .with_events(tx)
    .run(roots)
    .await
    .unwrap();

    let mut events: Vec<NodeEvent> = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), report.nodes().len());

    let boots = events
        .iter()
        .find(|e| e.path == vec!["Shoes".to_string(), "Boots".to_string()])
        .unwrap();
    assert_eq!(boots.status, NodeStatus::Expanded);
    assert_eq!(boots.strategy, Some(StrategyKind::FlatFilterCategory));
    assert_eq!(boots.produced, 3);
    assert_eq!(boots.depth, 2);
    assert_eq!(boots.attempts, 1);
    assert!(boots.error.is_none());
}

#[tokio::test]
async fn test_export_rows_and_reports() {
    let site = mixed_layout_site();
    let mut config = mixed_layout_config();
    let report = run(&config, &site).await;

    let sections = export_sections(&report.roots, true);
    assert_eq!(sections.len(), 3);

    let shoes = &sections[0];
    let labels: Vec<_> = shoes.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Running", "Court", "Chelsea", "Hiking", "Rain"]);
    assert_eq!(shoes.rows[0].level, 3);
    assert_eq!(shoes.rows[0].path, "Sneakers");
    assert_eq!(shoes.rows[2].kind, RowKind::Flat);
    assert_eq!(shoes.rows[2].level, 3);
    assert_eq!(shoes.rows[2].path, "Boots");

    let gifts = &sections[2];
    assert_eq!(gifts.rows.len(), 1);
    assert_eq!(gifts.rows[0].label, NO_CHILDREN_LABEL);
    assert_eq!(gifts.rows[0].kind, RowKind::NoChildren);

    let dir = tempfile::tempdir().unwrap();
    config.output.report_path = dir.path().join("report.md").display().to_string();
    config.output.database_path = Some(dir.path().join("report.db").display().to_string());

    let first = write_reports(&report, &config.output, "hash", Utc::now()).unwrap();
    let second = write_reports(&report, &config.output, "hash", Utc::now()).unwrap();

    assert_eq!(first[0], dir.path().join("report.md"));
    assert_eq!(second[0], dir.path().join("report_1.md"));
    assert_eq!(first[1], second[1]);

    let markdown = std::fs::read_to_string(&first[0]).unwrap();
    assert!(markdown.contains("## Shoes"));
    assert!(markdown.contains("| Chelsea | 3 | Boots |"));
}

// Static HTTP probe

const SHOES_PAGE: &str = r#"<html><body>
<ul class="menu-category__subcategory">
  <li class="menu-category__subcategory-item"><a class="menu-category__subcategory-link" href="/shoes/sneakers">Sneakers</a></li>
  <li class="menu-category__subcategory-item"><a class="menu-category__subcategory-link" href="/shoes/boots">Boots</a></li>
</ul>
</body></html>"#;

fn http_factory(server: &MockServer, navigation_timeout: Duration) -> HttpProbeFactory {
    let config = create_test_config(&[], &[]);
    let mut site = config.site;
    site.base_url = server.uri();
    HttpProbeFactory::from_site(&site, navigation_timeout).unwrap()
}

#[tokio::test]
async fn test_http_probe_reads_menu_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shoes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SHOES_PAGE)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let factory = http_factory(&server, Duration::from_secs(5));
    let mut probe = factory.open().await.unwrap();
    let wait = Duration::from_millis(10);

    probe.navigate("/shoes", wait * 500).await.unwrap();
    assert!(probe
        .wait_visible(&Marker::new("ul.menu-category__subcategory"), wait)
        .await
        .unwrap());

    let links = probe
        .find_all(&Marker::new("a.menu-category__subcategory-link"), wait)
        .await
        .unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(probe.text(links[1]).await.unwrap(), "Boots");
    assert_eq!(
        probe.attribute(links[0], "href").await.unwrap().as_deref(),
        Some("/shoes/sneakers")
    );
    probe.close().await.unwrap();
}

#[tokio::test]
async fn test_http_probe_maps_status_and_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let factory = http_factory(&server, Duration::from_secs(5));
    let mut probe = factory.open().await.unwrap();

    match probe.navigate("/missing", Duration::from_secs(5)).await {
        Err(ProbeError::Navigation { message, .. }) => assert_eq!(message, "HTTP 404"),
        other => panic!("expected a navigation error, got {:?}", other),
    }

    assert!(matches!(
        probe.navigate("/slow", Duration::from_millis(100)).await,
        Err(ProbeError::NavigationTimeout { .. })
    ));
}

#[tokio::test]
async fn test_crawl_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shoes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SHOES_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shoes/sneakers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let mut config = create_test_config(&[("Shoes", "/shoes")], &[]);
    config.site.base_url = server.uri();
    config.crawler.max_attempts = 2;

    let factory = Arc::new(http_factory(&server, config.crawler.navigation_timeout()));
    let listing = StaticRoots::from_config(&config.site);
    let report = crawl(&config, factory, &listing).await.unwrap();

    let sneakers = report.find(&["Shoes", "Sneakers"]).unwrap();
    assert_eq!(sneakers.status, NodeStatus::NoChildren);

    // wiremock answers unmatched requests with 404
    let boots = report.find(&["Shoes", "Boots"]).unwrap();
    assert_eq!(boots.status, NodeStatus::Failed);
    assert_eq!(boots.attempts, 2);
}
