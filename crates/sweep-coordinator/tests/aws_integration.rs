//! AWS integration tests - actually call AWS APIs
//!
//! These tests only list resources and run teardown in dry-run mode, so
//! nothing in the account is modified. They are marked `#[ignore]` and
//! only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_integration -- --ignored
//! ```


use aws_test_helpers::*;
use std::sync::Arc;
use sweep_common::ResourceKind;
use sweep_common::defaults::DEFAULT_LIST_RETRIES;
use sweep_coordinator::aws::get_current_account_id;
use sweep_coordinator::{
    HandlerRegistry, Inspector, Query, QueryParams, SkipReason, Selection, Terminator,
    TerminatorConfig,
};

#[tokio::test]
#[ignore]
async fn test_get_account_id() {
    let ctx = test_context().await;
    let account = get_current_account_id(&ctx)
        .await
        .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID");

    assert_eq!(account.len(), 12, "Account ID should be 12 digits: {account}");
    assert!(account.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
#[ignore]
async fn test_inspect_every_kind() {
    let ctx = test_context().await;
    let region = get_test_region();
    let registry = Arc::new(HandlerRegistry::aws(&ctx, DEFAULT_LIST_RETRIES));

    let query = Query::new(
        QueryParams {
            target_regions: vec![region.to_string()],
            ..Default::default()
        },
        &registry,
    )
    .unwrap();

    let inspection = Inspector::new(registry, 4).inspect(&query).await;
    assert!(
        inspection.is_complete(),
        "Listing failed: {:?}",
        inspection.error()
    );

    for kind in ResourceKind::ALL {
        assert!(
            inspection.inventory.scanned(&region, kind),
            "{kind} was not scanned"
        );
    }
    for d in inspection.inventory.iter() {
        assert_eq!(d.region, region);
    }
}

#[tokio::test]
#[ignore]
async fn test_dry_run_teardown_touches_nothing() {
    let ctx = test_context().await;
    let region = get_test_region();
    let registry = Arc::new(HandlerRegistry::aws(&ctx, DEFAULT_LIST_RETRIES));

    let query = Query::new(
        QueryParams {
            target_regions: vec![region.to_string()],
            ..Default::default()
        },
        &registry,
    )
    .unwrap();
    let inventory = Inspector::new(registry.clone(), 4)
        .inspect(&query)
        .await
        .inventory;

    let report = Terminator::new(registry, TerminatorConfig::default())
        .terminate(&inventory, &Selection::all())
        .await;

    assert_eq!(report.len(), inventory.total());
    assert_eq!(report.skipped_for(SkipReason::NotEnabled), inventory.total());
}
