//! End-to-end assembly of the per-customer dashboard view.

mod common;

use common::FixtureStore;
use customer360_core::{
    catalog::{FailureKind, QueryCatalog, QueryStatus},
    config::StoreConfig,
    insights::{MonthlyAmount, Rating},
    view::{Customer360View, RECENT_TRANSACTION_COLUMNS},
};

#[test]
fn c1_view_end_to_end() {
    let fixture = FixtureStore::build();
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C1", 10);

    assert!(!view.has_failures());
    let customer = view.profile.customer.as_ref().expect("profile row");
    assert_eq!(customer.income_segment, "High Income (>5 Juta)");

    let overview = view.portfolio.overview.as_ref().expect("portfolio overview");
    assert_eq!(overview.total_value, 500000.0);
    assert_eq!(overview.active_products, 1);
    assert_eq!(overview.categories, 2);
    assert_eq!(view.portfolio.products.len(), 2);

    let txn = view.transactions.overview.as_ref().expect("transaction overview");
    assert_eq!(txn.total_transactions, 3);
    assert_eq!(txn.payment_methods, 3);
    assert_eq!(
        view.transactions.monthly,
        vec![
            MonthlyAmount { month: "2024-01".into(), amount: 150000.0 },
            MonthlyAmount { month: "2024-02".into(), amount: 300000.0 },
        ]
    );
    assert_eq!(
        view.transactions.recent.column_names().collect::<Vec<_>>(),
        RECENT_TRANSACTION_COLUMNS.to_vec()
    );

    let insights = view.insights.as_ref().expect("insights");
    assert_eq!(insights.value_score, Rating::Medium);
    assert_eq!(insights.activity_level, Rating::Medium);
    assert_eq!(insights.risk_profile, Rating::Low);
}

#[test]
fn recent_transactions_respect_the_limit() {
    let fixture = FixtureStore::build();
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C1", 2);
    assert_eq!(view.transactions.recent.len(), 2);
    // The full history still drives the trend.
    assert_eq!(view.transactions.monthly.len(), 2);
}

#[test]
fn high_value_customer_insights() {
    let fixture = FixtureStore::build();
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C3", 10);

    let insights = view.insights.expect("insights");
    assert_eq!(insights.value_score, Rating::High);
    assert_eq!(insights.activity_level, Rating::Medium);
    assert_eq!(insights.risk_profile, Rating::Low);
}

#[test]
fn low_income_customer_is_medium_risk() {
    let fixture = FixtureStore::build();
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C2", 10);

    let insights = view.insights.expect("insights");
    assert_eq!(insights.activity_level, Rating::High);
    assert_eq!(insights.risk_profile, Rating::Medium);
}

#[test]
fn customer_without_activity_has_no_overviews() {
    let fixture = FixtureStore::build();
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C4", 10);

    assert!(!view.has_failures());
    assert!(view.profile.customer.is_some());
    assert!(view.portfolio.overview.is_none());
    assert!(view.transactions.overview.is_none());
    assert!(view.transactions.monthly.is_empty());
    assert!(view.insights.is_none());
}

#[test]
fn unavailable_store_yields_an_empty_failed_view() {
    let _ = env_logger::builder().is_test(true).try_init();
    let catalog = QueryCatalog::open(StoreConfig::at("/nonexistent/customer360/analytics.duckdb")).unwrap();

    assert!(catalog.list_customers().is_failed());
    let view = Customer360View::load(&catalog, "C1", 10);

    assert!(view.has_failures());
    for outcome in view.outcomes() {
        assert!(outcome.table.is_empty());
        assert!(matches!(
            outcome.status,
            QueryStatus::Failed { kind: FailureKind::Connection, .. }
        ));
    }
    assert!(view.profile.customer.is_none());
    assert!(view.insights.is_none());
    assert!(catalog.cache().is_empty());
}

#[test]
fn undecodable_profile_row_leaves_other_sections_intact() {
    let fixture = FixtureStore::build_with(
        "ALTER TABLE main_stg.stg_profile ALTER income_level TYPE VARCHAR;
         UPDATE main_stg.stg_profile SET income_level = 'n/a' WHERE customer_id = 'C1';",
    );
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C1", 10);

    // The query itself succeeded; only the typed record is missing.
    assert!(view.profile.outcome.is_ok());
    assert_eq!(view.profile.outcome.table.len(), 1);
    assert!(view.profile.customer.is_none());
    let error = view.profile.error.as_deref().expect("profile error");
    assert!(error.contains("n/a"), "{error}");

    assert!(view.portfolio.error.is_none());
    assert_eq!(view.portfolio.overview.as_ref().map(|o| o.total_value), Some(500000.0));
    assert_eq!(view.transactions.overview.as_ref().map(|t| t.total_transactions), Some(3));
    assert_eq!(view.transactions.monthly.len(), 2);
    assert!(view.insights.is_some());

    assert!(view.has_failures());
    assert_eq!(view.section_errors().count(), 1);
}

#[test]
fn view_serializes_with_status_tags() {
    let fixture = FixtureStore::build();
    let catalog = QueryCatalog::open(fixture.config.clone()).unwrap();
    let view = Customer360View::load(&catalog, "C1", 10);

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["profile"]["outcome"]["status"]["state"], "ok");
    assert_eq!(json["profile"]["customer"]["customer_id"], "C1");
    assert_eq!(json["insights"]["value_score"], "Medium");
}
