//! customer360: text/JSON front end for the Customer 360 dashboard.
//!
//! Usage:
//!   customer360 --config dashboard.json --customer C1
//!   customer360 --db my_duckdbt/analytics.duckdb --list
//!   customer360 --customer C1 --recent 20 --json

use anyhow::{Context, Result};
use customer360_core::{
    catalog::{QueryCatalog, QueryOutcome},
    config::DashboardConfig,
    insights::format_rupiah,
    model::CustomerRecord,
    table::{Table, Value},
    view::Customer360View,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json = has_flag(&args, "--json");
    let list_only = has_flag(&args, "--list");

    let mut config = match arg_value(&args, "--config") {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(path) = arg_value(&args, "--db") {
        config.store.db_path = path.to_string();
    }
    let recent = recent_limit(&args, config.recent_transactions)?;

    let catalog = QueryCatalog::open(config.store.clone())?;

    let customers_outcome = catalog.list_customers();
    let (customers, list_error) = match customers_outcome.table.decode::<CustomerRecord>() {
        Ok(customers) => (customers, customers_outcome.error_message().map(String::from)),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };
    if customers.is_empty() {
        if let Some(err) = list_error {
            eprintln!("Error loading customer list: {err}");
        }
        println!("No customer data available. Please run 'dbt seed' and 'dbt run' first.");
        return Ok(());
    }

    if list_only {
        if json {
            println!("{}", serde_json::to_string_pretty(&customers)?);
        } else {
            print_customer_list(&customers);
        }
        return Ok(());
    }

    let selected = match arg_value(&args, "--customer") {
        Some(id) => id.to_string(),
        None => customers[0].customer_id.clone(),
    };
    let listed = customers.iter().find(|c| c.customer_id == selected);
    if listed.is_none() {
        log::warn!("Customer {selected} is not in the customer list");
    }

    let view = Customer360View::load(&catalog, &selected, recent);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view, listed);
    }

    let stats = catalog.cache().stats();
    log::debug!(
        "cache: {} entries, {} hits, {} misses",
        stats.entries,
        stats.hits,
        stats.misses
    );
    Ok(())
}

fn print_customer_list(customers: &[CustomerRecord]) {
    println!("=== CUSTOMERS ({}) ===", customers.len());
    for c in customers {
        println!(
            "  {:<12} {:<3} {:<28} {}",
            c.customer_id,
            c.gender.as_deref().unwrap_or("-"),
            c.income_segment,
            c.income_bracket.as_deref().unwrap_or("-"),
        );
    }
}

fn print_view(view: &Customer360View, listed: Option<&CustomerRecord>) {
    println!("Customer 360 Dashboard");
    println!();

    if let Some(c) = listed {
        println!("=== CUSTOMER INFO ===");
        println!("  customer id:    {}", c.customer_id);
        println!("  gender:         {}", c.gender.as_deref().unwrap_or("-"));
        println!("  income segment: {}", c.income_segment);
        println!("  income bracket: {}", c.income_bracket.as_deref().unwrap_or("-"));
        println!();
    }

    println!("=== CUSTOMER PROFILE ===");
    section_status(&view.profile.outcome, "No profile found for this customer.");
    section_error(view.profile.error.as_deref());
    if let Some(c) = &view.profile.customer {
        println!("  customer id:    {}", c.customer_id);
        println!("  gender:         {}", c.gender.as_deref().unwrap_or("-"));
        println!(
            "  income level:   {}",
            c.income_level.map(|l| l.to_string()).unwrap_or_else(|| "-".into())
        );
        println!("  income segment: {}", c.income_segment);
    }
    println!();

    println!("=== PORTFOLIO ANALYSIS ===");
    section_status(&view.portfolio.holdings, "No portfolio holdings.");
    section_status(&view.portfolio.summary, "No portfolio summary.");
    section_error(view.portfolio.error.as_deref());
    if let Some(o) = &view.portfolio.overview {
        println!("  total portfolio value: {}", format_rupiah(o.total_value));
        println!("  active products:       {}", o.active_products);
        println!("  categories:            {}", o.categories);
        println!();
        println!("  distribution by category:");
        print_table(&view.portfolio.summary.table.head(
            view.portfolio.summary.table.len(),
            &["product_category", "total_amount", "portfolio_percentage"],
        ));
    }
    if !view.portfolio.products.is_empty() {
        println!("  product details:");
        print_table(&view.portfolio.products);
    }
    println!();

    println!("=== TRANSACTION ANALYSIS ===");
    section_status(&view.transactions.transactions, "No transactions.");
    section_status(&view.transactions.summary, "No transaction summary.");
    section_error(view.transactions.error.as_deref());
    if let Some(t) = &view.transactions.overview {
        println!("  total transactions: {}", t.total_transactions);
        println!("  total spent:        {}", format_rupiah(t.total_spent));
        println!("  avg transaction:    {}", format_rupiah(t.avg_transaction));
        println!("  payment methods:    {}", t.payment_methods);
        println!("  transaction types:  {}", t.transaction_types);
        println!("  transactions/day:   {:.2}", t.transactions_per_day);
    }
    if !view.transactions.monthly.is_empty() {
        println!("  monthly amount:");
        for m in &view.transactions.monthly {
            println!("    {} | {}", m.month, format_rupiah(m.amount));
        }
    }
    if !view.transactions.recent.is_empty() {
        println!("  recent transactions:");
        print_table(&view.transactions.recent);
    }
    println!();

    if let Some(i) = &view.insights {
        println!("=== CUSTOMER INSIGHTS ===");
        println!("  customer value score: {}", i.value_score.label());
        println!("  activity level:       {}", i.activity_level.label());
        println!("  risk profile:         {}", i.risk_profile.label());
    }
}

/// Inline warning for failures; a note for legitimately empty results.
fn section_status(outcome: &QueryOutcome, empty_note: &str) {
    if let Some(err) = outcome.error_message() {
        println!("  [warning] {} failed: {err}", outcome.operation.name());
    } else if outcome.is_no_data() {
        println!("  {empty_note}");
    }
}

fn section_error(error: Option<&str>) {
    if let Some(err) = error {
        println!("  [warning] some rows could not be read: {err}");
    }
}

fn print_table(table: &Table) {
    let header: Vec<&str> = table.column_names().collect();
    println!("    {}", header.join(" | "));
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(cell).collect();
        println!("    {}", cells.join(" | "));
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".into(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => format!("{f:.2}"),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// `--recent <n>` if given, else the configured default. A malformed value is an error.
fn recent_limit(args: &[String], default: usize) -> Result<usize> {
    match arg_value(args, "--recent") {
        Some(v) => v
            .parse()
            .with_context(|| format!("--recent expects a row count, got '{v}'")),
        None => Ok(default),
    }
}
