//! One-shot administration commands run against the configured backend and mock store.

use crate::infra::Services;
use clap::Args;
use std::path::PathBuf;
use visa_portal::config::AppConfig;
use visa_portal::error::AppError;
use visa_portal::telemetry;
use visa_portal::workflows::catalog::{ImportReport, ResourceKind};
use visa_portal::workflows::pricing::{ColumnSource, RepairReport};

#[derive(Args, Debug)]
pub(crate) struct ExitMockModeArgs {
    /// Resource to reconnect, by table name or route slug (e.g. visa_packages)
    #[arg(
        long,
        value_parser = parse_resource,
        required_unless_present = "all",
        conflicts_with = "all"
    )]
    pub(crate) resource: Option<ResourceKind>,
    /// Reconnect every resource
    #[arg(long)]
    pub(crate) all: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV with name, flag, banner, description, is_popular and optional pricing columns
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct InspectArgs {
    /// Table name or route slug
    #[arg(value_parser = parse_resource)]
    pub(crate) table: ResourceKind,
}

fn parse_resource(raw: &str) -> Result<ResourceKind, String> {
    ResourceKind::parse(raw.trim()).ok_or_else(|| format!("unknown resource '{raw}'"))
}

fn services() -> Result<Services, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Services::from_config(&config)
}

pub(crate) fn mock_mode_status() -> Result<(), AppError> {
    let services = services()?;
    let banners = services.catalog.store().banners();
    if banners.is_empty() {
        println!("No resources are in mock mode.");
        return Ok(());
    }

    println!("Mock mode active for {} resource(s):", banners.len());
    for banner in banners {
        println!(
            "  {} ({} local record(s)): {}",
            banner.resource.table(),
            banner.records,
            banner.message
        );
    }
    Ok(())
}

pub(crate) fn exit_mock_mode(args: ExitMockModeArgs) -> Result<(), AppError> {
    let services = services()?;
    let store = services.catalog.store();
    let kinds: Vec<ResourceKind> = if args.all {
        ResourceKind::ALL.to_vec()
    } else {
        args.resource.into_iter().collect()
    };

    for kind in kinds {
        if store.exit_mock_mode(kind)? {
            println!("{} reconnected to the database.", kind.label());
        } else if !args.all {
            println!("{} was not in mock mode.", kind.label());
        }
    }
    Ok(())
}

pub(crate) async fn import_catalog(args: ImportArgs) -> Result<(), AppError> {
    let services = services()?;
    let report = services.importer().import_path(&args.path).await?;
    render_import_report(&args.path, &report);
    Ok(())
}

fn render_import_report(path: &std::path::Path, report: &ImportReport) {
    println!("Catalog import from {}", path.display());
    println!(
        "  Countries created: {}, reused: {}",
        report.countries_created, report.countries_reused
    );
    println!(
        "  Packages saved: {} ({} in the local mock store)",
        report.packages_saved, report.packages_in_mock_store
    );
    if report.failures.is_empty() {
        return;
    }
    println!("  Failed rows:");
    for failure in &report.failures {
        println!(
            "    row {} ({}): {}",
            failure.row,
            failure.name.as_deref().unwrap_or("unparsed"),
            failure.error
        );
    }
}

pub(crate) async fn inspect_schema(args: InspectArgs) -> Result<(), AppError> {
    let services = services()?;
    let schema = services.doctor.inspect(args.table).await?;
    let source = match schema.source {
        ColumnSource::Procedure => "column listing procedure",
        ColumnSource::SampleRow => "sample row",
        ColumnSource::Unknown => "no rows to sample",
    };
    println!("{} (from {source})", schema.table);
    for column in &schema.columns {
        println!("  {column}");
    }
    if !schema.missing.is_empty() {
        let missing: Vec<&str> = schema.missing.iter().map(String::as_str).collect();
        println!("  Rejected by the schema cache: {}", missing.join(", "));
    }
    Ok(())
}

pub(crate) async fn refresh_schema() -> Result<(), AppError> {
    let services = services()?;
    services.doctor.refresh().await?;
    println!("Schema cache refreshed; remembered missing columns cleared.");
    Ok(())
}

pub(crate) async fn repair_schema() -> Result<(), AppError> {
    let services = services()?;
    let report = services.doctor.repair().await?;
    render_repair_report(&report);
    Ok(())
}

fn render_repair_report(report: &RepairReport) {
    if report.skipped_total_price {
        println!("total_price column is absent; totals left to the fee sum.");
    } else {
        println!("Recomputed totals for {} package(s).", report.totals_recomputed.len());
    }
    if report.packages_deactivated.is_empty() {
        println!("No duplicate active packages found.");
    } else {
        println!(
            "Deactivated {} duplicate active package(s): {}",
            report.packages_deactivated.len(),
            report.packages_deactivated.join(", ")
        );
    }
}
