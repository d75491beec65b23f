use std::collections::HashSet;
use std::fs;

use chrono::Local;
use tempfile::TempDir;

use pricewarden::catalog::Catalog;
use pricewarden::config::AppConfig;
use pricewarden::models::{parse_history, write_decisions, ChangeStatus, Decision};
use pricewarden::updater::CatalogUpdater;
use pricewarden::workflow::{MultiStoreWorkflow, Phase};

const HEADER: &str = "product_id,store_id,original_url,price,price_history,name,last_updated,category";

fn write_catalog(dir: &TempDir, name: &str, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn decision(product_id: &str, old: f64, new: f64, status: ChangeStatus) -> Decision {
    Decision {
        product_id: product_id.to_string(),
        old_price: Some(old),
        new_price: Some(new),
        price_change_needed: status,
    }
}

#[test]
fn test_apply_then_merge_keeps_only_changed_products() {
    let dir = TempDir::new().unwrap();

    // Two stores, each with one changed and one unchanged product.
    let metro = write_catalog(
        &dir,
        "metro_products.csv",
        &[
            "M1,Metro,https://example.com/m1,100,[],Sugar 1kg,,Grocery",
            "M2,Metro,https://example.com/m2,50,[],Salt 800g,,Grocery",
        ],
    );
    let rainbow = write_catalog(
        &dir,
        "rainbow_products.csv",
        &[
            "R1,Rainbow,https://example.com/r1,200,[],Ghee 1kg,,Grocery",
            "R2,Rainbow,https://example.com/r2,75,[],Tea 250g,,Grocery",
        ],
    );

    let metro_decisions = dir.path().join("metro_comparison.csv");
    write_decisions(
        &metro_decisions,
        &[
            decision("M1", 100.0, 120.0, ChangeStatus::Yes),
            decision("M2", 50.0, 50.0, ChangeStatus::No),
        ],
    )
    .unwrap();
    let rainbow_decisions = dir.path().join("rainbow_comparison.csv");
    write_decisions(
        &rainbow_decisions,
        &[
            decision("R1", 200.0, 180.0, ChangeStatus::Yes),
            decision(
                "R2",
                0.0,
                0.0,
                ChangeStatus::Error("Price not found on page".to_string()),
            ),
        ],
    )
    .unwrap();

    let metro_out = dir.path().join("metro_updated.csv");
    let rainbow_out = dir.path().join("rainbow_updated.csv");
    let metro_outcome = CatalogUpdater::apply(&metro_decisions, &metro, Some(&metro_out)).unwrap();
    let rainbow_outcome =
        CatalogUpdater::apply(&rainbow_decisions, &rainbow, Some(&rainbow_out)).unwrap();
    assert_eq!(metro_outcome.updated, 1);
    assert_eq!(rainbow_outcome.updated, 1);

    // Merge step: only YES product ids survive into the consolidated file.
    let changed: HashSet<String> = ["M1", "R1"].iter().map(|s| s.to_string()).collect();
    let mut consolidated = Catalog::read(&metro_out).unwrap().retain_products(&changed);
    let rainbow_changed = Catalog::read(&rainbow_out).unwrap().retain_products(&changed);
    consolidated.append(&rainbow_changed);

    let consolidated_path = dir.path().join("consolidated.csv");
    consolidated.write(&consolidated_path).unwrap();

    let merged = Catalog::read(&consolidated_path).unwrap();
    assert_eq!(merged.len(), 2);
    let ids: Vec<&str> = (0..merged.len())
        .map(|i| merged.get(i, "product_id").unwrap())
        .collect();
    assert_eq!(ids, vec!["M1", "R1"]);
    assert_eq!(merged.get_f64(0, "price"), Some(120.0));
    assert_eq!(merged.get_f64(1, "price"), Some(180.0));

    // Updated rows carry one current history entry and a timestamp.
    let history = parse_history(merged.get(0, "price_history").unwrap());
    assert_eq!(history.len(), 1);
    assert!(history[0].is_current);
    assert!(!merged.get(0, "last_updated").unwrap().is_empty());
}

#[test]
fn test_unknown_columns_survive_the_update_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products.csv");
    fs::write(
        &path,
        "product_id,store_id,original_url,price,internal_sku,notes\n\
         P1,Metro,https://example.com/p1,100,SKU-77,keep me\n",
    )
    .unwrap();

    let decisions = dir.path().join("comparison.csv");
    write_decisions(&decisions, &[decision("P1", 100.0, 110.0, ChangeStatus::Yes)]).unwrap();

    let out = dir.path().join("updated.csv");
    CatalogUpdater::apply(&decisions, &path, Some(&out)).unwrap();

    let updated = Catalog::read(&out).unwrap();
    assert_eq!(updated.get(0, "internal_sku"), Some("SKU-77"));
    assert_eq!(updated.get(0, "notes"), Some("keep me"));
    assert_eq!(updated.get_f64(0, "price"), Some(110.0));
}

fn workflow_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.workflow.output_dir = dir.path().join("price_updates").display().to_string();
    config.workflow.reports_dir = dir.path().join("reports").display().to_string();
    config.workflow.consolidated_path = dir.path().join("consolidated.csv").display().to_string();
    config
}

#[test]
fn test_apply_only_resume_consolidates_only_applied_updates() {
    let dir = TempDir::new().unwrap();
    let config = workflow_config(&dir);
    let output_dir = dir.path().join("price_updates");
    fs::create_dir_all(&output_dir).unwrap();

    // Split file and reviewed decisions as a previous --step1-only run
    // would have left them. DUP appears twice, so its YES decision must be
    // refused and kept out of the consolidated file.
    let mut products = String::from(HEADER);
    products.push('\n');
    for row in [
        "M1,Metro,https://example.com/m1,100,[],Sugar 1kg,,Grocery",
        "DUP,Metro,https://example.com/a,10,[],First,,Grocery",
        "DUP,Metro,https://example.com/b,20,[],Second,,Grocery",
        "M3,Metro,https://example.com/m3,50,[],Salt 800g,,Grocery",
    ] {
        products.push_str(row);
        products.push('\n');
    }
    fs::write(output_dir.join("metro_products.csv"), products).unwrap();

    let date = Local::now().format("%Y-%m-%d");
    write_decisions(
        output_dir.join(format!("metro_price_comparison_{date}.csv")),
        &[
            decision("M1", 100.0, 120.0, ChangeStatus::Yes),
            decision("DUP", 10.0, 30.0, ChangeStatus::Yes),
            decision("M3", 50.0, 50.0, ChangeStatus::No),
            decision("GHOST", 5.0, 6.0, ChangeStatus::Yes),
        ],
    )
    .unwrap();

    let mut workflow =
        MultiStoreWorkflow::new(config, dir.path().join("input.csv")).unwrap();
    let consolidated_path = workflow.run(Phase::ApplyOnly).unwrap().expect("consolidated file");

    let merged = Catalog::read(&consolidated_path).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.get(0, "product_id"), Some("M1"));
    assert_eq!(merged.get_f64(0, "price"), Some(120.0));

    // The refused duplicate kept its old prices in the store output but
    // never reached the consolidated file.
    let updated = Catalog::read(output_dir.join(format!("metro_updated_{date}.csv"))).unwrap();
    assert_eq!(updated.get_f64(1, "price"), Some(10.0));
    assert_eq!(updated.get_f64(2, "price"), Some(20.0));

    let summary = fs::read_to_string(
        dir.path().join("reports").join(format!("summary_report_{date}.txt")),
    )
    .unwrap();
    assert!(summary.contains("Metro updates applied: OK"));
}

#[test]
fn test_apply_only_with_no_changes_produces_no_consolidated_file() {
    let dir = TempDir::new().unwrap();
    let config = workflow_config(&dir);
    let output_dir = dir.path().join("price_updates");
    fs::create_dir_all(&output_dir).unwrap();

    fs::write(
        output_dir.join("metro_products.csv"),
        format!("{HEADER}\nM1,Metro,https://example.com/m1,100,[],Sugar 1kg,,Grocery\n"),
    )
    .unwrap();
    let date = Local::now().format("%Y-%m-%d");
    write_decisions(
        output_dir.join(format!("metro_price_comparison_{date}.csv")),
        &[decision("M1", 100.0, 100.0, ChangeStatus::No)],
    )
    .unwrap();

    let mut workflow =
        MultiStoreWorkflow::new(config, dir.path().join("input.csv")).unwrap();
    assert!(workflow.run(Phase::ApplyOnly).unwrap().is_none());
    assert!(!dir.path().join("consolidated.csv").exists());
}

#[test]
fn test_decision_file_round_trip_preserves_error_reasons() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("comparison.csv");
    let decisions = vec![
        decision("P1", 100.0, 100.0, ChangeStatus::No),
        decision("P2", 100.0, 130.0, ChangeStatus::Yes),
        decision(
            "P3",
            0.0,
            0.0,
            ChangeStatus::Error("Page timeout or failed to load".to_string()),
        ),
    ];
    write_decisions(&path, &decisions).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("NO"));
    assert!(text.contains("YES"));
    assert!(text.contains("ERROR - Page timeout or failed to load"));

    let read_back = pricewarden::models::read_decisions(&path).unwrap();
    assert_eq!(read_back.len(), 3);
    assert_eq!(read_back[2].price_change_needed, decisions[2].price_change_needed);
}
