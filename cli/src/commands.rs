//! Command handler for CLI

use crate::account::AccountManager;
use crate::ui;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use console_core::api::RuleFilter;
use console_core::{
    Client, CollaborationId, Operation, OrganizationId, Resource, RoleId, RuleKey, Scope, UserId,
};

pub struct CommandHandler {
    client: Client,
    account: AccountManager,
    /// Serving a fixture: passwords are not checked
    offline: bool,
}

impl CommandHandler {
    pub fn new(client: Client, account: AccountManager, offline: bool) -> Self {
        Self {
            client,
            account,
            offline,
        }
    }

    /// Prompt label: the logged-in username, or a placeholder
    pub fn prompt_name(&self) -> String {
        self.client
            .session()
            .and_then(|session| session.user.username.clone())
            .unwrap_or_else(|| "guest".to_string())
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<()> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(());
        }

        match parts[0] {
            "login" => self.cmd_login(&parts[1..]).await,
            "logout" => self.cmd_logout(),
            "whoami" => self.cmd_whoami(),
            "version" | "about" => self.cmd_version(),
            "rules" => self.cmd_rules(&parts[1..]).await,
            "can" => self.cmd_can(&parts[1..]),
            "can-min" => self.cmd_can_min(&parts[1..]),
            "can-org" => self.cmd_can_org(&parts[1..]),
            "can-collab" => self.cmd_can_collab(&parts[1..]).await,
            "can-assign" => self.cmd_can_assign(&parts[1..]),
            "editor" => self.cmd_editor(&parts[1..]).await,
            "toggle" => self.cmd_toggle(&parts[1..]),
            "grid" => self.cmd_grid(),
            "changes" => self.cmd_changes(),
            "reset" => self.cmd_reset(),
            "help" => {
                ui::print_help();
                Ok(())
            }
            _ => {
                ui::print_error(&format!("Unknown command: {}", parts[0]));
                ui::print_info("Type 'help' for available commands");
                Ok(())
            }
        }
    }

    fn cmd_version(&self) -> Result<()> {
        println!();
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", format!("  {}", console_core::version_string()).bright_cyan().bold());
        println!("{}", "  Permission console for federated analysis".bright_white());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("{} {}", "Build:".bright_green(), console_core::version::BUILD_PROFILE);
        println!();
        Ok(())
    }

    async fn cmd_login(&mut self, args: &[&str]) -> Result<()> {
        let username = match args.first() {
            Some(name) => name.to_string(),
            None => match self.account.username() {
                Some(name) => name.to_string(),
                None => bail!("Usage: login <username>"),
            },
        };

        let password = if self.offline {
            String::new()
        } else {
            crate::password::read_password("Password: ")?
        };

        ui::print_info(&format!("Logging in as {}...", username));
        let session = self.client.login(&username, &password).await?;
        let granted = session.active.rules.len();
        let total = session.catalog.len();

        self.account.remember(&username)?;
        ui::print_success(&format!("Logged in: {} of {} rules granted", granted, total));
        Ok(())
    }

    fn cmd_logout(&mut self) -> Result<()> {
        if !self.client.is_authenticated() {
            ui::print_warning("Not logged in");
            return Ok(());
        }
        self.client.logout();
        ui::print_success("Logged out");
        Ok(())
    }

    fn cmd_whoami(&self) -> Result<()> {
        let session = match self.client.session() {
            Some(session) => session,
            None => {
                ui::print_warning("Not logged in");
                if let (Some(name), Some(at)) = (self.account.username(), self.account.last_login()) {
                    println!(
                        "  {} {} ({})",
                        "Last login:".bright_green(),
                        name.bright_cyan(),
                        at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
                return Ok(());
            }
        };

        let user = &session.user;
        let mut shared: Vec<OrganizationId> =
            session.active.shared_organizations.iter().copied().collect();
        shared.sort();

        println!();
        if let Some(name) = &user.username {
            println!("{} {}", "Username:".bright_green(), name.bright_cyan());
        }
        println!("{} {}", "User ID:".bright_green(), user.id);
        println!("{} {}", "Organization:".bright_green(), user.organization_id);
        println!(
            "{} {}",
            "Shared organizations:".bright_green(),
            shared.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );
        println!(
            "{} {} of {}",
            "Rules granted:".bright_green(),
            session.active.rules.len(),
            session.catalog.len()
        );
        println!();
        Ok(())
    }

    async fn cmd_rules(&self, args: &[&str]) -> Result<()> {
        let filter = match args {
            [] => RuleFilter::All,
            ["role", id] => RuleFilter::Role(id.parse::<RoleId>()?),
            ["user", id] => RuleFilter::User(id.parse::<UserId>()?),
            _ => bail!("Usage: rules [role <id> | user <id>]"),
        };
        let rules = self.client.rules(filter).await?;
        ui::print_rules(&rules);
        Ok(())
    }

    fn cmd_can(&self, args: &[&str]) -> Result<()> {
        let (scope, resource, operation) = parse_scoped(args, "can")?;
        let allowed = self.client.evaluator().is_allowed(scope, resource, operation);
        ui::print_verdict(&format!("{} {} at scope {}", operation, resource, scope), allowed);
        Ok(())
    }

    fn cmd_can_min(&self, args: &[&str]) -> Result<()> {
        let (scope, resource, operation) = parse_scoped(args, "can-min")?;
        let allowed = self
            .client
            .evaluator()
            .is_allowed_with_minimum_scope(scope, resource, operation);
        ui::print_verdict(
            &format!("{} {} at scope {} or broader", operation, resource, scope),
            allowed,
        );
        Ok(())
    }

    fn cmd_can_org(&self, args: &[&str]) -> Result<()> {
        let [resource, operation, org] = args else {
            bail!("Usage: can-org <resource> <operation> <org_id>");
        };
        let resource: Resource = resource.parse()?;
        let operation: Operation = operation.parse()?;
        let org: OrganizationId = org.parse()?;

        let allowed = self
            .client
            .evaluator()
            .is_allowed_for_organization(resource, operation, Some(org));
        ui::print_verdict(&format!("{} {} in organization {}", operation, resource, org), allowed);
        Ok(())
    }

    async fn cmd_can_collab(&self, args: &[&str]) -> Result<()> {
        let [resource, operation, collab] = args else {
            bail!("Usage: can-collab <resource> <operation> <collaboration_id>");
        };
        let resource: Resource = resource.parse()?;
        let operation: Operation = operation.parse()?;
        let id: CollaborationId = collab.parse()?;

        let collaboration = self
            .client
            .collaboration(id)
            .await
            .with_context(|| format!("Failed to fetch collaboration {}", id))?;
        let allowed = self
            .client
            .evaluator()
            .is_allowed_for_collaboration(resource, operation, Some(&collaboration));
        ui::print_verdict(
            &format!("{} {} in collaboration {} ({})", operation, resource, id, collaboration.name),
            allowed,
        );
        Ok(())
    }

    fn cmd_can_assign(&self, args: &[&str]) -> Result<()> {
        let (scope, resource, operation) = parse_scoped(args, "can-assign")?;
        let allowed = self
            .client
            .evaluator()
            .is_allowed_to_assign_rule_to_role(scope, resource, operation);
        ui::print_verdict(&format!("assign {}:{}:{} to a role", resource, scope, operation), allowed);
        Ok(())
    }

    async fn cmd_editor(&mut self, args: &[&str]) -> Result<()> {
        let ["role", id] = args else {
            bail!("Usage: editor role <id>");
        };
        let role_id: RoleId = id.parse()?;

        let matrix = self.client.open_role_editor(role_id).await?;
        let rows = matrix.rows();
        let selected = matrix.selected_rules().len();

        ui::print_success(&format!(
            "Editing role {}: {} rows, {} rules on",
            role_id,
            rows.len(),
            selected
        ));
        ui::print_grid(&rows);
        Ok(())
    }

    fn cmd_toggle(&mut self, args: &[&str]) -> Result<()> {
        let [resource, scope, operation] = args else {
            bail!("Usage: toggle <resource> <scope> <operation>");
        };
        let key = RuleKey::new(resource.parse()?, scope.parse()?, operation.parse()?);

        let rules = self.client.toggle(key)?;
        let on = self
            .client
            .editor()
            .map(|editor| editor.matrix.is_selected(key))
            .unwrap_or(false);
        ui::print_success(&format!(
            "{} is now {} ({} rules on)",
            key,
            if on { "on" } else { "off" },
            rules.len()
        ));
        Ok(())
    }

    fn cmd_grid(&self) -> Result<()> {
        let editor = self
            .client
            .editor()
            .context("No role editor is open. Use: editor role <id>")?;
        if let Some(role_id) = editor.role_id {
            println!("{} {}", "Role:".bright_green(), role_id);
        }
        ui::print_grid(&editor.matrix.rows());
        Ok(())
    }

    fn cmd_changes(&self) -> Result<()> {
        let changes = self.client.editor_changes()?;
        ui::print_changes(&changes);
        Ok(())
    }

    fn cmd_reset(&mut self) -> Result<()> {
        let rules = self.client.reset_editor()?;
        ui::print_success(&format!("Editor reset ({} rules on)", rules.len()));
        Ok(())
    }
}

/// Parse `<scope> <resource> <operation>`
fn parse_scoped(args: &[&str], command: &str) -> Result<(Scope, Resource, Operation)> {
    let [scope, resource, operation] = args else {
        bail!("Usage: {} <scope> <resource> <operation>", command);
    };
    Ok((scope.parse()?, resource.parse()?, operation.parse()?))
}
