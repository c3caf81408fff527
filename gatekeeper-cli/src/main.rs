//! Gatekeeper CLI - Command-line interface for the IAM backend
//!
//! Drives the console's page controllers from the terminal: authenticate, inspect the
//! principal's permissions, manage users, groups, roles, modules and permissions.

mod console;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use console::{optional, settle, Console, Output};
use gatekeeper_console::{
    AssignedEntry, ModuleActions, PermissionSummary, ResourcePage,
};
use gatekeeper_core::{
    init_logging, Action, Credentials, EntityId, GatekeeperConfig, Group, GroupDraft,
    LoggingConfig, Module, ModuleDraft, Permission, PermissionDraft, Resource, Role, RoleDraft,
    User, UserDraft,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Administer users, groups, roles and permissions of an IAM backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in with it
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "GATEKEEPER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Sign in and cache the principal's permissions
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "GATEKEEPER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in principal
    Whoami,

    /// Show the principal's permissions grouped by module
    MyPermissions {
        /// Fetch from the backend instead of reading the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Ask the backend whether the principal may perform an action
    Simulate {
        #[arg(long)]
        module_id: EntityId,
        #[arg(long)]
        action: Action,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage groups and their members
    Groups {
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Manage roles and their permissions
    Roles {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Manage modules
    Modules {
        #[command(subcommand)]
        command: NamedCommands,
    },

    /// Manage permissions
    Permissions {
        #[command(subcommand)]
        command: PermissionCommands,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    List,
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "GATEKEEPER_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    Update {
        id: EntityId,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    Delete {
        id: EntityId,
    },
}

/// CRUD for entities that only carry a name
#[derive(Subcommand)]
enum NamedCommands {
    List,
    Create { name: String },
    Update { id: EntityId, name: String },
    Delete { id: EntityId },
}

#[derive(Subcommand)]
enum GroupCommands {
    #[command(flatten)]
    Crud(NamedCommands),
    /// Add users to a group
    AddUsers {
        group_id: EntityId,
        #[arg(required = true, num_args = 1..)]
        user_ids: Vec<EntityId>,
    },
    RemoveUser {
        group_id: EntityId,
        user_id: EntityId,
    },
    /// Give a group a role
    AddRole {
        group_id: EntityId,
        role_id: EntityId,
    },
    RemoveRole {
        group_id: EntityId,
        role_id: EntityId,
    },
}

#[derive(Subcommand)]
enum RoleCommands {
    #[command(flatten)]
    Crud(NamedCommands),
    /// Assign a permission to a role
    Grant {
        role_id: EntityId,
        permission_id: EntityId,
    },
    /// Remove a permission from a role
    Revoke {
        role_id: EntityId,
        permission_id: EntityId,
    },
}

#[derive(Subcommand)]
enum PermissionCommands {
    List,
    Create {
        #[arg(long)]
        module_id: EntityId,
        #[arg(long)]
        action: Action,
    },
    /// Permissions are immutable pairs; changing either field is refused
    Update {
        id: EntityId,
        #[arg(long)]
        module_id: Option<EntityId>,
        #[arg(long)]
        action: Option<Action>,
    },
    Delete {
        id: EntityId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    config.apply_env_overrides();
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if cli.verbose {
        config.logging = LoggingConfig::verbose();
    }

    init_logging(&config.logging).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
    info!("Starting Gatekeeper CLI v{}", env!("CARGO_PKG_VERSION"));

    let out = Output { json: cli.json };

    if let Commands::Config {
        show,
        init,
        validate,
    } = cli.command
    {
        return handle_config(show, init, validate, &config);
    }

    let console = Console::connect(&config)?;

    match cli.command {
        Commands::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let draft = UserDraft {
                username,
                email,
                password,
                first_name,
                last_name,
            };
            handle_register(&console, &draft, out).await
        }
        Commands::Login { username, password } => {
            handle_login(&console, Credentials { username, password }, out).await
        }
        Commands::Logout => {
            console.auth.logout().await?;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami => handle_whoami(&console, out).await,
        Commands::MyPermissions { refresh } => handle_my_permissions(&console, refresh, out).await,
        Commands::Simulate { module_id, action } => {
            handle_simulate(&console, module_id, action, out).await
        }
        Commands::Users { command } => handle_users(&console, command, out).await,
        Commands::Groups { command } => handle_groups(&console, command, out).await,
        Commands::Roles { command } => handle_roles(&console, command, out).await,
        Commands::Modules { command } => handle_modules(&console, command, out).await,
        Commands::Permissions { command } => handle_permissions(&console, command, out).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Candidate configuration files, most specific first
fn config_candidates() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|d| d.join("gatekeeper").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".gatekeeper").join("config.toml")),
        Some(PathBuf::from("gatekeeper.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn load_config(config_path: Option<&PathBuf>) -> Result<GatekeeperConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return Ok(GatekeeperConfig::from_file(path)?);
    }

    for path in config_candidates() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Ok(GatekeeperConfig::from_file(&path)?);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(GatekeeperConfig::default())
}

fn handle_config(show: bool, init: bool, validate: bool, config: &GatekeeperConfig) -> Result<()> {
    if init {
        let config_path = config_candidates()
            .into_iter()
            .next()
            .context("No configuration directory available")?;
        if config_path.exists() {
            println!("Configuration already exists at: {:?}", config_path);
        } else {
            GatekeeperConfig::default().save_to_file(&config_path)?;
            println!("Configuration initialized at: {:?}", config_path);
        }
    }

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    if validate {
        config.validate()?;
        println!("Configuration is valid");
    }

    Ok(())
}

async fn handle_register(console: &Console, draft: &UserDraft, out: Output) -> Result<()> {
    let user = settle(console.auth.register(draft, &console.token).await)?;
    out.one(&user, |u| format!("Registered and signed in as {}", u.display_name()))?;

    // The account may not hold any permission yet
    if let Err(e) = settle(console.auth.load_permissions(&console.token).await) {
        eprintln!("Could not load permissions: {}", e);
    }
    Ok(())
}

async fn handle_login(console: &Console, credentials: Credentials, out: Output) -> Result<()> {
    let user = settle(console.auth.login(&credentials, &console.token).await)?;
    if !out.json {
        println!("Signed in as {}", user.display_name());
    }

    let summary = settle(console.dashboard().mount(&console.token).await)?;
    print_summary(&summary, out)
}

async fn handle_whoami(console: &Console, out: Output) -> Result<()> {
    let user = console
        .auth
        .current_user()
        .await
        .context("Not signed in. Run `gatekeeper login` first.")?;
    out.one(&user, |u| {
        format!("{} (id {}, email {})", u.display_name(), u.id, u.email)
    })
}

async fn handle_my_permissions(console: &Console, refresh: bool, out: Output) -> Result<()> {
    let summary = if refresh {
        settle(console.dashboard().mount(&console.token).await)?
    } else {
        console.dashboard().summary().await
    };
    print_summary(&summary, out)
}

fn print_summary(summary: &PermissionSummary, out: Output) -> Result<()> {
    out.list(&summary.modules, |m: &ModuleActions| {
        format!("{}: {}", m.module, m.actions.join(", "))
    })
}

async fn handle_simulate(
    console: &Console,
    module_id: EntityId,
    action: Action,
    out: Output,
) -> Result<()> {
    let dashboard = console.dashboard();
    let verdict = settle(
        dashboard
            .simulator()
            .simulate(module_id, action, &console.token)
            .await,
    )?;
    out.one(&verdict, |v| {
        let label = if v.allowed { "ALLOWED" } else { "DENIED" };
        format!("{}: {}", label, v.message)
    })
}

/// Fetch a fresh list and return the cached entity with `id`
async fn loaded<R: Resource>(
    page: &ResourcePage<R>,
    console: &Console,
    id: EntityId,
) -> Result<R> {
    settle(page.mount(&console.token).await)?;
    page.store()
        .find(id)
        .await
        .with_context(|| format!("No {} with id {}", R::SINGULAR, id))
}

async fn list_all<R: Resource>(
    page: &ResourcePage<R>,
    console: &Console,
    out: Output,
    line: impl Fn(&R) -> String,
) -> Result<()> {
    let items = settle(page.mount(&console.token).await)?;
    out.list(&items, line)
}

async fn delete_one<R: Resource>(page: &ResourcePage<R>, console: &Console, id: EntityId) -> Result<()> {
    let id = settle(page.delete(id, &console.token).await?)?;
    println!("Deleted {} {}", R::SINGULAR, id);
    Ok(())
}

fn user_line(user: &User) -> String {
    format!("{:>5}  {:<20} {}", user.id, user.display_name(), user.email)
}

fn named_line(id: EntityId, name: &str, detail: String) -> String {
    format!("{:>5}  {:<20} {}", id, name, detail)
}

fn print_entries(entries: &[AssignedEntry], out: Output) -> Result<()> {
    if out.json {
        let ids: Vec<EntityId> = entries.iter().map(|e| e.id).collect();
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }
    for entry in entries {
        println!("{:>5}  {}", entry.id, entry.label);
    }
    Ok(())
}

async fn handle_users(console: &Console, command: UserCommands, out: Output) -> Result<()> {
    let page = console.users_page();
    match command {
        UserCommands::List => list_all(&page, console, out, user_line).await,
        UserCommands::Create {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let draft = UserDraft {
                username,
                email,
                password,
                first_name,
                last_name,
            };
            let user = settle(page.create(&draft, &console.token).await?)?;
            out.one(&user, |u| format!("Created user {}", u.id))
        }
        UserCommands::Update {
            id,
            username,
            email,
            first_name,
            last_name,
        } => {
            let mut user = loaded(&page, console, id).await?;
            if let Some(username) = username {
                user.username = username;
            }
            if let Some(email) = email {
                user.email = email;
            }
            if let Some(first_name) = first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = last_name {
                user.last_name = last_name;
            }
            let user = settle(page.update(&user, &console.token).await?)?;
            out.one(&user, |u| format!("Updated user {}", u.id))
        }
        UserCommands::Delete { id } => delete_one(&page, console, id).await,
    }
}

async fn handle_named<R, D>(
    page: &ResourcePage<R>,
    console: &Console,
    command: NamedCommands,
    out: Output,
    draft: impl FnOnce(String) -> D,
    rename: impl FnOnce(&mut R, String),
    line: impl Fn(&R) -> String,
) -> Result<()>
where
    R: Resource<Draft = D>,
{
    match command {
        NamedCommands::List => list_all(page, console, out, line).await,
        NamedCommands::Create { name } => {
            let created = settle(page.create(&draft(name), &console.token).await?)?;
            out.one(&created, |e| format!("Created {} {}", R::SINGULAR, e.id()))
        }
        NamedCommands::Update { id, name } => {
            let mut entity = loaded(page, console, id).await?;
            rename(&mut entity, name);
            let updated = settle(page.update(&entity, &console.token).await?)?;
            out.one(&updated, |e| format!("Updated {} {}", R::SINGULAR, e.id()))
        }
        NamedCommands::Delete { id } => delete_one(page, console, id).await,
    }
}

async fn handle_groups(console: &Console, command: GroupCommands, out: Output) -> Result<()> {
    let page = console.groups_page();
    let token = &console.token;

    match command {
        GroupCommands::Crud(command) => {
            handle_named(
                &page,
                console,
                command,
                out,
                |name| GroupDraft { name },
                |group: &mut Group, name| group.name = name,
                |g| named_line(g.id, &g.name, format!("{} users, {} roles", g.users.len(), g.roles.len())),
            )
            .await
        }
        GroupCommands::AddUsers { group_id, user_ids } => {
            let mut flow = page.manage_users(group_id, console.users.clone()).await?;
            loaded(&page, console, group_id).await?;
            settle(flow.open(token).await)?;

            for user_id in user_ids {
                flow.select(user_id);
                if let Some(outcome) = flow.confirm(token).await {
                    settle(outcome)?;
                }
            }
            if let Some(message) = flow.banner().message() {
                eprintln!("{}", message);
            }
            print_entries(&flow.members().await, out)
        }
        GroupCommands::RemoveUser { group_id, user_id } => {
            let mut flow = page.manage_users(group_id, console.users.clone()).await?;
            loaded(&page, console, group_id).await?;
            settle(flow.open(token).await)?;
            settle(flow.remove(user_id, token).await)?;
            print_entries(&flow.members().await, out)
        }
        GroupCommands::AddRole { group_id, role_id } => {
            let mut flow = console
                .roles_page()
                .assign_to_groups(role_id, console.groups.clone())
                .await?;
            settle(flow.open(token).await)?;
            flow.select(group_id);
            if let Some(outcome) = flow.confirm(token).await {
                settle(outcome)?;
            }
            if let Some(message) = flow.banner().message() {
                println!("{}", message);
            }
            Ok(())
        }
        GroupCommands::RemoveRole { group_id, role_id } => {
            let mut flow = console
                .roles_page()
                .assign_to_groups(role_id, console.groups.clone())
                .await?;
            settle(flow.open(token).await)?;
            settle(flow.remove(group_id, token).await)?;
            println!("Removed role {} from group {}", role_id, group_id);
            Ok(())
        }
    }
}

async fn handle_roles(console: &Console, command: RoleCommands, out: Output) -> Result<()> {
    let page = console.roles_page();
    let token = &console.token;

    match command {
        RoleCommands::Crud(command) => {
            handle_named(
                &page,
                console,
                command,
                out,
                |name| RoleDraft { name },
                |role: &mut Role, name| role.name = name,
                |r| named_line(r.id, &r.name, format!("{} permissions", r.permissions.len())),
            )
            .await
        }
        RoleCommands::Grant {
            role_id,
            permission_id,
        } => {
            let mut flow = console
                .permissions_page()
                .assign_to_roles(console.roles.clone(), console.modules.clone())
                .await?;
            settle(flow.open(token).await)?;
            flow.select_role(role_id);
            flow.select_permission(permission_id);
            if let Some(outcome) = flow.confirm(token).await {
                settle(outcome)?;
            }
            if let Some(message) = flow.banner().message() {
                eprintln!("{}", message);
            }
            print_entries(&flow.current_permissions().await, out)
        }
        RoleCommands::Revoke {
            role_id,
            permission_id,
        } => {
            let mut flow = console
                .permissions_page()
                .assign_to_roles(console.roles.clone(), console.modules.clone())
                .await?;
            settle(flow.open(token).await)?;
            flow.select_role(role_id);
            if let Some(outcome) = flow.remove(permission_id, token).await {
                settle(outcome)?;
            }
            print_entries(&flow.current_permissions().await, out)
        }
    }
}

async fn handle_modules(console: &Console, command: NamedCommands, out: Output) -> Result<()> {
    handle_named(
        &console.modules_page(),
        console,
        command,
        out,
        |name| ModuleDraft { name },
        |module: &mut Module, name| module.name = name,
        |m| named_line(m.id, &m.name, String::new()),
    )
    .await
}

async fn handle_permissions(
    console: &Console,
    command: PermissionCommands,
    out: Output,
) -> Result<()> {
    let page = console.permissions_page();
    let token = &console.token;

    match command {
        PermissionCommands::List => {
            let permissions = settle(page.mount(token).await)?;
            let modules = optional(console.modules.fetch_all(token).await, "module names")
                .unwrap_or_default();
            out.list(&permissions, |p: &Permission| {
                format!(
                    "{:>5}  {} - {}",
                    p.id,
                    gatekeeper_console::module_name(&modules, p.module_id),
                    p.action
                )
            })
        }
        PermissionCommands::Create { module_id, action } => {
            let draft = PermissionDraft { action, module_id };
            let permission = settle(page.create(&draft, token).await?)?;
            out.one(&permission, |p| format!("Created permission {}", p.id))
        }
        PermissionCommands::Update {
            id,
            module_id,
            action,
        } => {
            let mut requested = loaded(&page, console, id).await?;
            if let Some(module_id) = module_id {
                requested.module_id = module_id;
            }
            if let Some(action) = action {
                requested.action = action;
            }
            let permission = settle(page.update(&requested, token).await?)?;
            out.one(&permission, |p| format!("Updated permission {}", p.id))
        }
        PermissionCommands::Delete { id } => delete_one(&page, console, id).await,
    }
}
