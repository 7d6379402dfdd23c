//! Rules command - create, inspect and toggle rules

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use feedrules_core::config::EngineConfig;
use feedrules_core::services::RuleValidator;
use feedrules_core::{Rule, RuleDraft};

use super::{get_context, get_data_dir, read_document};
use crate::output;

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List all rules in evaluation order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single rule
    Show {
        /// Rule ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a rule from a JSON definition
    Add {
        /// Read the definition from a file (stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a rule's definition
    Update {
        /// Rule ID
        id: i64,
        /// Read the definition from a file (stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a rule
    Remove {
        /// Rule ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Enable a rule
    Enable {
        /// Rule ID
        id: i64,
    },

    /// Disable a rule
    Disable {
        /// Rule ID
        id: i64,
    },

    /// Check a rule definition without saving it
    Validate {
        /// Read the definition from a file (stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show match statistics
    Stats {
        /// Number of top rules to show
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: RulesCommands) -> Result<()> {
    match command {
        RulesCommands::List { json } => run_list(json).await,
        RulesCommands::Show { id, json } => run_show(id, json).await,
        RulesCommands::Add { file, json } => run_add(file.as_deref(), json).await,
        RulesCommands::Update { id, file } => run_update(id, file.as_deref()).await,
        RulesCommands::Remove { id, force } => run_remove(id, force).await,
        RulesCommands::Enable { id } => run_set_enabled(id, true).await,
        RulesCommands::Disable { id } => run_set_enabled(id, false).await,
        RulesCommands::Validate { file } => run_validate(file.as_deref()),
        RulesCommands::Stats { top, json } => run_stats(top, json).await,
    }
}

fn read_draft(file: Option<&Path>) -> Result<RuleDraft> {
    let doc = read_document(file)?;
    serde_json::from_str(&doc).context("Invalid rule definition")
}

async fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let rules = ctx.rule_service.list_rules().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        output::info("No rules defined");
        return Ok(());
    }

    println!("{}", output::rules_table(&rules));
    Ok(())
}

async fn run_show(id: i64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let rule = ctx
        .rule_service
        .get_rule(id)
        .await?
        .with_context(|| format!("Rule {} not found", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rule)?);
        return Ok(());
    }

    print_rule(&rule);
    Ok(())
}

fn print_rule(rule: &Rule) {
    println!("{}", rule.name.bold());
    println!("  ID: {}", rule.id);
    println!("  Enabled: {}", rule.enabled);
    println!("  Priority: {}", rule.priority);
    println!("  Stop on match: {}", rule.stop_on_match);
    println!("  Condition: {}", output::describe_matcher(&rule.matcher));
    println!("  Scope: {}", output::describe_scope(&rule.scope));
    println!("  Action: {}", output::describe_action(&rule.action));
    println!("  Matches: {}", rule.match_count);
    println!("  Created: {}", rule.created_at.to_rfc3339());
    println!("  Modified: {}", rule.last_modified.to_rfc3339());
}

async fn run_add(file: Option<&Path>, json: bool) -> Result<()> {
    let draft = read_draft(file)?;
    let ctx = get_context()?;
    let rule = ctx.rule_service.create_rule(Some(&draft)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rule)?);
    } else {
        output::success(&format!("Rule '{}' created", rule.name));
        println!("  Rule ID: {}", rule.id);
        println!("  Priority: {}", rule.priority);
    }
    Ok(())
}

async fn run_update(id: i64, file: Option<&Path>) -> Result<()> {
    let draft = read_draft(file)?;
    let ctx = get_context()?;

    if !ctx.rule_service.update_rule(id, Some(&draft)).await? {
        anyhow::bail!("Rule {} not found", id);
    }
    output::success(&format!("Rule {} updated", id));
    Ok(())
}

async fn run_remove(id: i64, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let rule = ctx
        .rule_service
        .get_rule(id)
        .await?
        .with_context(|| format!("Rule {} not found", id))?;

    // Confirm removal unless --force
    if !force {
        println!(
            "\n{}",
            format!("This will delete rule '{}' ({} matches).", rule.name, rule.match_count).yellow()
        );
        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    if !ctx.rule_service.delete_rule(id).await? {
        anyhow::bail!("Rule {} not found", id);
    }
    println!("{} Rule '{}' removed", "✓".green(), rule.name);
    Ok(())
}

async fn run_set_enabled(id: i64, enabled: bool) -> Result<()> {
    let ctx = get_context()?;
    if !ctx.rule_service.set_enabled(id, enabled).await? {
        anyhow::bail!("Rule {} not found", id);
    }
    let state = if enabled { "enabled" } else { "disabled" };
    output::success(&format!("Rule {} {}", id, state));
    Ok(())
}

fn run_validate(file: Option<&Path>) -> Result<()> {
    let draft = read_draft(file)?;
    // Reads settings only, never opens the store
    let config = EngineConfig::load(&get_data_dir()?)?;

    match RuleValidator::new(&config).validate(&draft, None) {
        Ok(_) => {
            output::success("Rule definition is valid");
            Ok(())
        }
        Err(e) => anyhow::bail!("Rule definition is invalid: {}", e),
    }
}

async fn run_stats(top: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let stats = ctx.rule_service.get_stats(top).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Rule Statistics".bold());
    println!();

    let mut summary = output::create_table();
    summary.add_row(vec!["Rules", &stats.total_rules.to_string()]);
    summary.add_row(vec!["Enabled", &stats.enabled_rules.to_string()]);
    summary.add_row(vec!["Total matches", &stats.total_match_count.to_string()]);
    println!("{}", summary);

    if !stats.top_rules.is_empty() {
        println!();
        println!("{}", "Most matched".bold());
        let mut table = output::create_table();
        table.set_header(vec!["ID", "Name", "Matches"]);
        for r in &stats.top_rules {
            table.add_row(vec![r.id.to_string(), r.name.clone(), r.match_count.to_string()]);
        }
        println!("{}", table);
    }
    Ok(())
}
