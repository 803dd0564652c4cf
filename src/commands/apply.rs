//! Plan, apply and import commands
//!
//! - `plan` - Refresh state and show what apply would change
//! - `apply` - Make remote resources match the manifest
//! - `import` - Adopt an existing remote object into state

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    ApplyResult, AutoConfirm, Change, ConfirmCallback, Declared, ExecuteOptions, ExecuteOutcome,
    ExecuteSummary, Plan, Provider, ProgressCallback, State, display_value, execute,
};
use std::path::Path;

use super::Session;
use crate::Context;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

// ============================================================================
// Commands
// ============================================================================

pub fn plan(ctx: &Context, target: Option<&str>, jobs: usize) -> Result<()> {
    let session = Session::open(ctx, true)?;
    let state = StateFile::load(&session.state_path)?;
    let provider = resource::provider(&session.api);
    let declared = session.manifest.declared()?;

    ui::header("Plan");
    let plan = refresh(&provider, &declared, &state, target, jobs)?;
    print_plan(&plan);
    Ok(())
}

pub fn apply(
    ctx: &Context,
    target: Option<&str>,
    yes: bool,
    dry_run: bool,
    jobs: usize,
) -> Result<()> {
    let session = Session::open(ctx, true)?;
    let mut state = StateFile::load(&session.state_path)?;
    let provider = resource::provider(&session.api);
    let declared = session.manifest.declared()?;

    ui::header("Apply");
    let plan = refresh(&provider, &declared, &state, target, jobs)?;
    print_plan(&plan);

    if !plan.has_changes() {
        // Still persist the refresh so vanished resources are forgotten
        if !dry_run {
            persist(&mut state, plan.refreshed, &session.state_path)?;
        }
        return Ok(());
    }

    if dry_run {
        println!();
        ui::info("Dry run: no changes made");
        return Ok(());
    }

    let opts = ExecuteOptions { dry_run, jobs };
    let mut progress = ConsoleProgress::new(ctx.quiet);
    let outcome = if yes {
        execute(&provider, &plan, &opts, &mut progress, &mut AutoConfirm)?
    } else {
        execute(&provider, &plan, &opts, &mut progress, &mut DialoguerConfirm)?
    };

    persist(&mut state, outcome.state.clone(), &session.state_path)?;

    print_summary(&outcome);
    if !outcome.summary.is_success() {
        bail!("{} resource(s) failed to apply", outcome.summary.failed);
    }
    Ok(())
}

pub fn import(ctx: &Context, address: &str, id: &str) -> Result<()> {
    let session = Session::open(ctx, false)?;
    let mut state = StateFile::load(&session.state_path)?;
    let provider = resource::provider(&session.api);

    let data = import_into(&provider, &mut state, address, id)?;
    state.save(&session.state_path)?;

    ui::success(&format!("Imported {address} (id {})", data.id));
    Ok(())
}

// ============================================================================
// Core logic
// ============================================================================

/// Refresh and plan, limited to `target`
fn refresh(
    provider: &Provider,
    declared: &[Declared],
    state: &StateFile,
    target: Option<&str>,
    jobs: usize,
) -> Result<Plan> {
    let plan = declarative::plan(provider, declared, &state.resources, jobs)?;
    Ok(plan.filter_by_target(target))
}

/// Save `resources` to `path` when they differ from what `state` records
fn persist(state: &mut StateFile, resources: State, path: &Path) -> Result<bool> {
    if state.resources == resources {
        return Ok(false);
    }
    state.resources = resources;
    state.save(path)?;
    Ok(true)
}

/// Import `address` into `state`; an address already recorded is refused
fn import_into(
    provider: &Provider,
    state: &mut StateFile,
    address: &str,
    id: &str,
) -> Result<declarative::ResourceData> {
    if state.resources.contains_key(address) {
        bail!("{address} is already managed; remove it from state before importing");
    }
    let data = provider.import(address, id)?;
    state.resources.insert(address.to_string(), data.clone());
    Ok(data)
}

// ============================================================================
// Callbacks
// ============================================================================

/// Prints one line per applied change
struct ConsoleProgress {
    quiet: bool,
}

impl ConsoleProgress {
    fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_batch_start(&mut self, count: usize) {
        if !self.quiet {
            println!();
            println!("  Applying {count} change(s)...");
        }
    }

    fn on_change_start(&mut self, address: &str, change: Change) {
        log::info!("{change} {address}");
    }

    fn on_change_complete(&mut self, address: &str, result: &ApplyResult) {
        match result {
            ApplyResult::Failed { error } => {
                println!("    {} {}: {}", "✗".red(), address, error.red());
            }
            ApplyResult::Skipped { reason } if !self.quiet => {
                println!("    {} {} ({})", "-".dimmed(), address, reason.dimmed());
            }
            _ if !self.quiet => {
                println!("    {} {} {}", "✓".green(), address, result_label(result).dimmed());
            }
            _ => {}
        }
    }

    fn on_batch_complete(&mut self) {}
}

/// Asks on the terminal
struct DialoguerConfirm;

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        println!();
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

fn result_label(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "unchanged",
        ApplyResult::Created => "created",
        ApplyResult::Modified => "updated",
        ApplyResult::Replaced => "replaced",
        ApplyResult::Removed => "deleted",
        ApplyResult::Failed { .. } => "failed",
        ApplyResult::Skipped { .. } => "skipped",
    }
}

// ============================================================================
// Display
// ============================================================================

fn change_symbol(change: Change) -> String {
    let symbol = change.symbol();
    match change {
        Change::Create => symbol.green().bold().to_string(),
        Change::Update => symbol.yellow().bold().to_string(),
        Change::Replace | Change::Delete => symbol.red().bold().to_string(),
        Change::NoOp => symbol.to_string(),
    }
}

fn print_plan(plan: &Plan) {
    for address in &plan.dropped {
        ui::warn(&format!("{address} no longer exists remotely; dropped from state"));
    }

    if !plan.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    for change in plan.pending() {
        println!(
            "  {} {} {}",
            change_symbol(change.change),
            change.address.bold(),
            format!("({})", change.change).dimmed()
        );
        for diff in &change.diffs {
            let old = diff
                .old
                .as_ref()
                .map_or_else(|| "(none)".to_string(), display_value);
            let note = if diff.forces_new && change.change == Change::Replace {
                " # forces replacement".red().to_string()
            } else {
                String::new()
            };
            println!(
                "      {}: {} → {}{}",
                diff.key,
                old.dimmed(),
                display_value(&diff.new),
                note
            );
        }
    }

    println!();
    println!(
        "  Plan: {} to create, {} to update, {} to replace, {} to delete",
        plan.count(Change::Create),
        plan.count(Change::Update),
        plan.count(Change::Replace),
        plan.count(Change::Delete)
    );
}

fn print_summary(outcome: &ExecuteOutcome) {
    let summary: &ExecuteSummary = &outcome.summary;

    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources updated", summary.modified);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} resources deleted", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
        for (address, error) in &outcome.failures {
            ui::dim(&format!("{address}: {error}"));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
