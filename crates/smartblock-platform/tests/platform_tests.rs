//! Integration tests for the persistent host implementations

use smartblock_core::host::{EmptyDirectory, RuleInstaller};
use smartblock_core::messages::{Request, Response};
use smartblock_core::{BlockerService, Collaborators, Config, RuleCompiler};
use smartblock_platform::{open_storage, DynamicRuleTable, RULES_FILE};
use std::path::Path;
use std::sync::Arc;

async fn service_in(dir: &Path) -> (BlockerService, Arc<DynamicRuleTable>) {
    let table = Arc::new(DynamicRuleTable::open(dir.join(RULES_FILE), 5000).await.unwrap());
    let storage = open_storage(dir).await.unwrap();
    let installer: Arc<dyn RuleInstaller> = Arc::clone(&table) as Arc<dyn RuleInstaller>;
    let service = BlockerService::new(
        Config::default(),
        storage,
        Collaborators::new(installer, Arc::new(EmptyDirectory)),
    );
    (service, table)
}

#[tokio::test]
async fn test_rule_table_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(RULES_FILE);
    let rules = RuleCompiler::default().compile(&["a.test", "b.test"], &[] as &[&str]);

    let table = DynamicRuleTable::open(&path, 10).await.unwrap();
    table.apply(&[], rules.clone()).await.unwrap();
    drop(table);

    let reopened = DynamicRuleTable::open(&path, 10).await.unwrap();
    assert_eq!(reopened.rules(), rules);
}

#[tokio::test]
async fn test_rejected_update_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(RULES_FILE);
    let table = DynamicRuleTable::open(&path, 1).await.unwrap();
    table
        .apply(&[], RuleCompiler::default().compile(&["a.test"], &[] as &[&str]))
        .await
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    let result = table
        .apply(&[], RuleCompiler::default().compile(&["b.test"], &[] as &[&str]))
        .await;
    assert!(result.is_err());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_service_restart_reuses_installed_rules() {
    let dir = tempfile::tempdir().unwrap();

    let (service, table) = service_in(dir.path()).await;
    service.initialize().await.unwrap();
    assert_eq!(table.len(), 10);
    let response = service
        .handle(Request::TrackerDetected {
            hostname: "doubleclick.net".into(),
            url: None,
            timestamp: None,
        })
        .await;
    assert!(response.is_success());
    service.on_suspend().await;
    let installed = table.rules();
    drop(service);

    let (restarted, table) = service_in(dir.path()).await;
    restarted.initialize().await.unwrap();
    assert_eq!(table.rules(), installed);
    assert_eq!(restarted.reconciler().snapshot().len(), 10);

    match restarted.handle(Request::GetPerformanceStats).await {
        Response::PerformanceStats(stats) => {
            assert_eq!(stats.total_blocked, 1);
            assert_eq!(stats.data_saved, 50);
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_short_links_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (service, _) = service_in(dir.path()).await;
    let short = service.shortener().shorten("https://example.com/page", None).await.unwrap();
    drop(service);

    let (restarted, _) = service_in(dir.path()).await;
    let resolved = restarted
        .handle(Request::ResolveShortUrl { hash: short.hash })
        .await;
    assert_eq!(resolved, Response::ResolvedUrl(Some("https://example.com/page".into())));
}
