//! Command handlers.
//!
//! Each handler resolves its arguments against the catalog or the migration
//! engine and prints the result to stdout, as text or as JSON.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use mediatrack_core::{
    parse_options, Catalog, Category, CreateCategoryRequest, CreateFieldRequest, Field, FieldType,
    Item, MigrationReport, Principal, SchemaMigrator, UpdateCategoryRequest, UpdateFieldRequest,
};

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a new user
    Add {
        /// Username (e.g. an email address)
        username: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// List your categories
    List,
    /// Create a category
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show a category with its fields
    Show { id: Uuid },
    /// Rename a category, optionally changing its description
    Update {
        id: Uuid,
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a category with all its fields and items
    Rm { id: Uuid },
}

#[derive(Subcommand)]
pub enum FieldCommand {
    /// List the fields of a category
    List { category: Uuid },
    /// Add a field to a category
    Add {
        category: Uuid,
        name: String,
        /// Text, Notes, Number, Date, Boolean or Select
        #[arg(short = 't', long = "type", default_value = "Text")]
        field_type: FieldType,
        /// Comma separated options for Select fields
        #[arg(short, long)]
        options: Option<String>,
    },
    /// Rename a field and move its values in every item
    Rename {
        id: Uuid,
        name: String,
        /// New type (keeps the current one if omitted)
        #[arg(short = 't', long = "type")]
        field_type: Option<FieldType>,
        /// New comma separated options; an empty string clears them
        #[arg(short, long)]
        options: Option<String>,
    },
    /// Change a field's type or options without touching items
    Update {
        id: Uuid,
        #[arg(short = 't', long = "type")]
        field_type: Option<FieldType>,
        #[arg(short, long)]
        options: Option<String>,
    },
    /// Delete a field and remove its values from every item
    Rm { id: Uuid },
}

#[derive(Subcommand)]
pub enum ItemCommand {
    /// List the items of a category, newest first
    List { category: Uuid },
    /// Add an item from KEY=VALUE pairs
    Add {
        category: Uuid,
        #[arg(value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
    /// Show an item and how it lines up with its category's fields
    Show { id: Uuid },
    /// Set values on an item from KEY=VALUE pairs
    Set {
        id: Uuid,
        #[arg(value_parser = parse_assignment, required = true)]
        values: Vec<(String, String)>,
    },
    /// Delete an item
    Rm { id: Uuid },
}

/// Parse a `KEY=VALUE` argument. The value may be empty or contain `=`.
pub fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Options from a comma separated flag; blank input clears the list.
fn options_from_flag(raw: &str) -> Option<Vec<String>> {
    let options = parse_options(raw);
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

/// Shared state for running commands.
pub struct Context {
    pub catalog: Catalog,
    pub migrator: SchemaMigrator,
    pub principal: Principal,
    pub json: bool,
}

impl Context {
    fn emit<T: serde::Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

pub async fn category(ctx: &Context, command: CategoryCommand) -> Result<()> {
    let p = &ctx.principal;
    match command {
        CategoryCommand::List => {
            let categories = ctx.catalog.list_categories(p).await?;
            ctx.emit(&categories, || {
                categories
                    .iter()
                    .map(format_category)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        CategoryCommand::Add { name, description } => {
            let req = CreateCategoryRequest { name, description };
            let category = ctx.catalog.create_category(p, req).await?;
            ctx.emit(&category, || format_category(&category))
        }
        CategoryCommand::Show { id } => {
            let category = ctx.catalog.get_category(p, id).await?;
            let fields = ctx.catalog.list_fields(p, id).await?;
            let value = json!({ "category": category, "fields": fields });
            ctx.emit(&value, || {
                let mut out = format_category(&category);
                for field in &fields {
                    out.push_str("\n  ");
                    out.push_str(&format_field(field));
                }
                out
            })
        }
        CategoryCommand::Update {
            id,
            name,
            description,
        } => {
            let req = UpdateCategoryRequest { name, description };
            let category = ctx.catalog.update_category(p, id, req).await?;
            ctx.emit(&category, || format_category(&category))
        }
        CategoryCommand::Rm { id } => {
            ctx.catalog.delete_category(p, id).await?;
            ctx.emit(&json!({ "deleted": id }), || format!("Deleted category {}", id))
        }
    }
}

pub async fn field(ctx: &Context, command: FieldCommand) -> Result<()> {
    let p = &ctx.principal;
    match command {
        FieldCommand::List { category } => {
            let fields = ctx.catalog.list_fields(p, category).await?;
            ctx.emit(&fields, || {
                fields.iter().map(format_field).collect::<Vec<_>>().join("\n")
            })
        }
        FieldCommand::Add {
            category,
            name,
            field_type,
            options,
        } => {
            let req = CreateFieldRequest {
                name,
                field_type,
                options: options.as_deref().and_then(options_from_flag),
            };
            let field = ctx.migrator.create_field(p, category, req).await?;
            ctx.emit(&field, || format_field(&field))
        }
        FieldCommand::Rename {
            id,
            name,
            field_type,
            options,
        } => {
            let current = ctx.catalog.get_field(p, id).await?;
            let req = UpdateFieldRequest {
                name,
                field_type: field_type.unwrap_or(current.field_type),
                options: match options {
                    Some(raw) => options_from_flag(&raw),
                    None => current.options,
                },
            };
            let old_name = current.name;
            let report = ctx.migrator.rename_field(p, id, req).await?;
            ctx.emit(&report, || format_report(&format!("Renamed '{}' to", old_name), &report))
        }
        FieldCommand::Update {
            id,
            field_type,
            options,
        } => {
            let current = ctx.catalog.get_field(p, id).await?;
            let options = match options {
                Some(raw) => options_from_flag(&raw),
                None => current.options,
            };
            let field = ctx
                .migrator
                .update_field_metadata(p, id, field_type.unwrap_or(current.field_type), options)
                .await?;
            ctx.emit(&field, || format_field(&field))
        }
        FieldCommand::Rm { id } => {
            let report = ctx.migrator.delete_field(p, id).await?;
            ctx.emit(&report, || format_report("Deleted", &report))
        }
    }
}

pub async fn item(ctx: &Context, command: ItemCommand) -> Result<()> {
    let p = &ctx.principal;
    match command {
        ItemCommand::List { category } => {
            let items = ctx.catalog.list_items(p, category).await?;
            ctx.emit(&items, || {
                items.iter().map(format_item).collect::<Vec<_>>().join("\n\n")
            })
        }
        ItemCommand::Add { category, values } => {
            let data = ctx.catalog.coerce_document(p, category, &values).await?;
            let item = ctx.catalog.create_item(p, category, data).await?;
            ctx.emit(&item, || format_item(&item))
        }
        ItemCommand::Show { id } => {
            let item = ctx.catalog.get_item(p, id).await?;
            let conformance = ctx.catalog.item_conformance(p, id).await?;
            let value = json!({ "item": item, "conformance": conformance });
            ctx.emit(&value, || {
                let mut out = format_item(&item);
                if !conformance.stale_keys.is_empty() {
                    out.push_str(&format!(
                        "\n  (keys without a field: {})",
                        conformance.stale_keys.join(", ")
                    ));
                }
                if !conformance.missing_fields.is_empty() {
                    out.push_str(&format!(
                        "\n  (fields without a value: {})",
                        conformance.missing_fields.join(", ")
                    ));
                }
                out
            })
        }
        ItemCommand::Set { id, values } => {
            let item = ctx.catalog.set_item_values(p, id, &values).await?;
            ctx.emit(&item, || format_item(&item))
        }
        ItemCommand::Rm { id } => {
            ctx.catalog.delete_item(p, id).await?;
            ctx.emit(&json!({ "deleted": id }), || format!("Deleted item {}", id))
        }
    }
}

pub fn require_user(flag: Option<String>, default: Option<String>) -> Result<String> {
    flag.or(default)
        .ok_or_else(|| anyhow!("no user given; pass --user NAME or set MEDIATRACK_USER"))
}

fn format_category(c: &Category) -> String {
    format!("{}  {}  {}", c.id, c.name, c.description)
}

fn format_field(f: &Field) -> String {
    match &f.options {
        Some(options) if !options.is_empty() => {
            format!("{}  {} ({}) [{}]", f.id, f.name, f.field_type, options.join(", "))
        }
        _ => format!("{}  {} ({})", f.id, f.name, f.field_type),
    }
}

fn format_item(item: &Item) -> String {
    let mut out = item.id.to_string();
    for (key, value) in item.data.iter() {
        out.push_str(&format!("\n  {}: {}", key, value));
    }
    out
}

fn format_report(action: &str, report: &MigrationReport) -> String {
    format!(
        "{} field '{}': {}/{} items migrated ({} scanned)",
        action,
        report.field.name,
        report.items_migrated,
        report.items_needing_migration,
        report.items_scanned
    )
}
