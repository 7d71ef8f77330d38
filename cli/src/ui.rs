//! UI utilities for pretty printing

use colored::{ColoredString, Colorize};
use console_core::permissions::{CellState, MatrixRow, RuleChanges};
use console_core::{Operation, Rule};

pub fn print_help() {
    println!();
    println!("{}", "Available Commands:".bright_cyan().bold());
    println!();
    println!("  {:<44} {}", "help".bright_green(), "Show this help message");
    println!("  {:<44} {}", "quit, exit".bright_green(), "Exit the application");
    println!("  {:<44} {}", "version".bright_green(), "Show version and build info");
    println!();
    println!("  {}", "Session:".bright_yellow().bold());
    println!("  {:<44} {}", "login [username]".bright_green(), "Log in (defaults to the last username)");
    println!("  {:<44} {}", "logout".bright_green(), "Drop the session");
    println!("  {:<44} {}", "whoami".bright_green(), "Show the logged-in user");
    println!();
    println!("  {}", "Rules:".bright_yellow().bold());
    println!("  {:<44} {}", "rules".bright_green(), "List the rule catalog");
    println!("  {:<44} {}", "rules role <id> | rules user <id>".bright_green(), "List rules of a role or user");
    println!();
    println!("  {}", "Checks:".bright_yellow().bold());
    println!("  {:<44} {}", "can <scope> <resource> <op>".bright_green(), "Exact-scope check");
    println!("  {:<44} {}", "can-min <scope> <resource> <op>".bright_green(), "Granted at this scope or broader");
    println!("  {:<44} {}", "can-org <resource> <op> <org_id>".bright_green(), "Check against an organization");
    println!("  {:<44} {}", "can-collab <resource> <op> <collab_id>".bright_green(), "Check against a collaboration");
    println!("  {:<44} {}", "can-assign <scope> <resource> <op>".bright_green(), "May this rule be put in a role");
    println!();
    println!("  {}", "Role editor:".bright_yellow().bold());
    println!("  {:<44} {}", "editor role <id>".bright_green(), "Open the permission grid for a role");
    println!("  {:<44} {}", "toggle <resource> <scope> <op>".bright_green(), "Flip a cell");
    println!("  {:<44} {}", "grid".bright_green(), "Show the permission grid");
    println!("  {:<44} {}", "changes".bright_green(), "Show rules added and removed");
    println!("  {:<44} {}", "reset".bright_green(), "Restore the role's current rules");
    println!();
}

pub fn print_error(msg: &str) {
    println!("{} {}", "✗".bright_red(), msg.red());
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".bright_green(), msg.bright_green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".bright_blue(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".bright_yellow(), msg.yellow());
}

/// Verdict of a single check
pub fn print_verdict(question: &str, allowed: bool) {
    if allowed {
        println!("  {} {}", "allowed".bright_green().bold(), question);
    } else {
        println!("  {} {}", "denied ".bright_red().bold(), question);
    }
}

pub fn print_rules(rules: &[Rule]) {
    println!();
    if rules.is_empty() {
        print_info("No rules");
    } else {
        println!("{} ({}):", "Rules".bright_cyan().bold(), rules.len());
        for rule in rules {
            println!(
                "  {:>5}  {:<14} {:<14} {}",
                rule.id.to_string().bright_yellow(),
                rule.resource.as_str(),
                rule.scope.as_str(),
                rule.operation.as_str()
            );
        }
    }
    println!();
}

fn cell_symbol(state: CellState) -> ColoredString {
    match state {
        CellState::NotApplicable => " ".normal(),
        CellState::FixedSelected => "■".bright_blue(),
        CellState::FixedNotSelected => "·".bright_black(),
        CellState::Selected => "✓".bright_green(),
        CellState::NotSelected => "○".white(),
    }
}

pub fn print_grid(rows: &[MatrixRow]) {
    println!();
    if rows.is_empty() {
        print_info("The grid is empty");
        println!();
        return;
    }

    print!("  {:<14} {:<14}", "resource".bold(), "scope".bold());
    for operation in Operation::CONCRETE {
        print!(" {:^8}", operation.as_str().bold());
    }
    println!();

    let mut last_resource = None;
    for row in rows {
        let resource = if last_resource == Some(row.resource) {
            String::new()
        } else {
            row.resource.to_string()
        };
        last_resource = Some(row.resource);

        print!("  {:<14} {:<14}", resource.bright_cyan(), row.scope.as_str());
        for cell in &row.cells {
            print!(" {:^8}", cell_symbol(cell.state));
        }
        println!();
    }

    println!();
    println!(
        "  {} selected  {} not selected  {} fixed on  {} cannot grant",
        cell_symbol(CellState::Selected),
        cell_symbol(CellState::NotSelected),
        cell_symbol(CellState::FixedSelected),
        cell_symbol(CellState::FixedNotSelected)
    );
    println!();
}

pub fn print_changes(changes: &RuleChanges) {
    println!();
    if changes.is_empty() {
        print_info("No changes");
        println!();
        return;
    }
    for rule in &changes.added {
        println!("  {} {} (#{})", "+".bright_green().bold(), rule.key(), rule.id);
    }
    for rule in &changes.removed {
        println!("  {} {} (#{})", "-".bright_red().bold(), rule.key(), rule.id);
    }
    println!();
}
