//! Rule listing.

use std::path::Path;

use anyhow::{Context, Result};
use custodian_store::{Predicate, RuleStore};

use super::fixture;
use crate::style;

/// Lists every rule, active or not, in evaluation order.
pub fn run(fixture: &Path, json: bool) -> Result<()> {
    let store = fixture::load(fixture)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let rules = runtime
        .block_on(store.list_rules())
        .context("Failed to list rules")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!("No rules defined.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = rules
        .iter()
        .map(|rule| {
            vec![
                rule.sequence.to_string(),
                rule.name.clone(),
                rule.effect.to_string(),
                if rule.active { "yes" } else { "no" }.to_string(),
                describe(rule.condition.predicates()),
            ]
        })
        .collect();
    println!(
        "{}",
        style::table(&["#", "Name", "Effect", "Active", "Condition"], &rows)
    );
    Ok(())
}

fn describe(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return "always".to_string();
    }
    predicates
        .iter()
        .map(|p| match p {
            Predicate::Time(window) => format!("time = {window:?}"),
            Predicate::Department(dept) => format!("department = {}", String::from(dept.clone())),
            Predicate::Network(net) => format!("network = {}", String::from(net.clone())),
            Predicate::Equals { key, value } => format!("{key} = {value}"),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}
