mod demo;

use anyhow::{bail, Context};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use itertools::Itertools;
use std::env;
use tracing::{info, warn};

use perfchart::data::loader::load_operations;
use perfchart::data::sample::TrackingAlloc;
use perfchart::{ReportBuilder, ReportConfig, Sweep};

#[global_allocator]
static GLOBAL_TRACKER: TrackingAlloc = TrackingAlloc;

fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&String>) -> anyhow::Result<ReportConfig> {
    match path {
        Some(p) => ReportConfig::from_json_file(p).with_context(|| format!("reading config {}", p)),
        None => Ok(ReportConfig::default()),
    }
}

fn run_demo(cfg: &ReportConfig) -> anyhow::Result<()> {
    let mut benches = demo::benchmarks();
    let mut report = ReportBuilder::from_config(cfg);
    let summary = Sweep::from_config(cfg).run(&mut benches, &mut report)?;

    for err in &summary.rejected {
        warn!(error = %err, "rejected");
    }
    info!(
        accepted = summary.accepted,
        rejected = summary.rejected.len(),
        operations = report.rendered(),
        "sweep complete"
    );
    Ok(())
}

fn run_check(path: &str) -> anyhow::Result<bool> {
    let decls = load_operations(path).with_context(|| format!("loading declarations {}", path))?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["operation", "x", "series", "pages", "invocations", "status"]);

    let mut ok = true;
    for decl in &decls {
        let name = decl.qualified_name();
        match decl.validate() {
            Ok(summary) => {
                let names = |idx: &[usize]| idx.iter().map(|&i| decl.params[i].name.as_str()).join(", ");
                table.add_row(vec![
                    name,
                    decl.params[summary.roles.x].name.clone(),
                    names(summary.roles.series.as_slice()),
                    names(summary.roles.page.as_slice()),
                    summary.invocations.to_string(),
                    "ok".to_string(),
                ]);
            }
            Err(e) => {
                ok = false;
                table.add_row(vec![
                    name,
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    e.to_string(),
                ]);
            }
        }
    }
    println!("{table}");
    Ok(ok)
}

fn run(args: &[String]) -> anyhow::Result<()> {
    if args.len() < 2 {
        println!("Usage: perfchart <demo [config.json] | check <operations.json>>");
        return Ok(());
    }

    match args[1].as_str() {
        "demo" => {
            let cfg = load_config(args.get(2))?;
            init_logging(&cfg.log_level);
            run_demo(&cfg)?;
        }
        "check" => {
            init_logging("info");
            let path = args.get(2).context("check needs a declarations file")?;
            if !run_check(path)? {
                std::process::exit(1);
            }
        }
        other => bail!("unknown command '{}', use 'demo' or 'check'", other),
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    run(&args)
}
