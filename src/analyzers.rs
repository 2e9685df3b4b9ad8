//! Analyzer administration commands: `validate`, `list-analyzers`,
//! `setup-analyzers`, `show-analyzer`, `delete-analyzer`, and
//! `teardown-analyzers`.

use std::fmt::Write as _;

use anyhow::Result;
use doc_orchestrator_core::PipelineConfig;

use crate::context::AppContext;

/// Field names shown per category by `list-analyzers`.
const LISTED_FIELDS: usize = 5;

/// Print configuration issues. Returns `true` when there are none.
pub fn run_validate(config: &PipelineConfig) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!(
            "Configuration valid: {} categories configured",
            config.categories.len()
        );
        return true;
    }

    println!("Configuration issues found:");
    for issue in &issues {
        println!("  - {}", issue);
    }
    false
}

/// Human-readable summary of the router and each category analyzer.
pub fn describe_analyzers(config: &PipelineConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Configured Analyzers:");
    let _ = writeln!(out, "  Router: {}", config.azure.router_analyzer_id);
    let _ = writeln!(out);
    let _ = writeln!(out, "Category Analyzers:");
    for cat in &config.categories {
        let fields: Vec<&str> = cat.extraction_schema.keys().map(String::as_str).collect();
        let more = if fields.len() > LISTED_FIELDS { "..." } else { "" };
        let shown = &fields[..fields.len().min(LISTED_FIELDS)];
        let _ = writeln!(out, "  {}:", cat.id);
        let _ = writeln!(out, "    Analyzer ID: {}", cat.analyzer_id);
        let _ = writeln!(out, "    Display Name: {}", cat.display_name);
        let _ = writeln!(out, "    Fields: {}{}", shown.join(", "), more);
    }
    out
}

pub fn run_list_analyzers(config: &PipelineConfig) {
    print!("{}", describe_analyzers(config));
}

pub async fn run_setup_analyzers(ctx: &AppContext) -> Result<()> {
    println!(
        "Setting up analyzers for {} categories...",
        ctx.pipeline.categories.len()
    );
    let report = ctx.provisioner.setup_all(&ctx.pipeline).await?;

    println!("Analyzers created/updated:");
    println!("  Router: {}", report.router_analyzer_id);
    for cat in &ctx.pipeline.categories {
        println!("  Category '{}': {}", cat.id, cat.analyzer_id);
    }
    Ok(())
}

pub async fn run_show_analyzer(ctx: &AppContext, analyzer_id: &str) -> Result<()> {
    match ctx.gateway.get_analyzer(analyzer_id).await? {
        Some(definition) => println!("{}", serde_json::to_string_pretty(&definition)?),
        None => println!("Analyzer '{}' does not exist.", analyzer_id),
    }
    Ok(())
}

pub async fn run_delete_analyzer(ctx: &AppContext, analyzer_id: &str) -> Result<()> {
    ctx.gateway.delete_analyzer(analyzer_id).await?;
    println!("Deleted analyzer '{}'.", analyzer_id);
    Ok(())
}

pub async fn run_teardown_analyzers(ctx: &AppContext) -> Result<()> {
    let report = ctx.provisioner.teardown_all(&ctx.pipeline).await?;
    println!("Analyzers deleted:");
    println!("  Router: {}", report.router_analyzer_id);
    for id in &report.category_analyzer_ids {
        println!("  {}", id);
    }
    Ok(())
}
