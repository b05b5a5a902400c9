//! Output formatting for CLI commands.
//!
//! JSON output is the response exactly as the engine would receive it.
//! Text output summarizes it in tables for people.

use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::diff::{DiffResponse, PropertyDiffKind};
use crate::error::Result;
use crate::property::{PropertyMap, PropertyValue};
use crate::resources::{CheckResponse, CreateResponse, ReadResponse, UpdateResponse};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Check failure row for table display.
#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Changed key row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Change")]
    change: String,
}

/// Property row for table display.
#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Body printed when a create left a partially initialized resource behind.
#[derive(Serialize)]
struct PartialJson<'a> {
    id: &'a str,
    properties: &'a PropertyMap,
    reasons: &'a [String],
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a check response.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_check(&self, response: &CheckResponse) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(response);
        }
        if response.failures.is_empty() {
            let mut output = format!("{} Inputs are valid\n", "✓".green());
            output.push_str(&Self::properties_table(&response.inputs));
            return Ok(output);
        }

        let rows: Vec<FailureRow> = response
            .failures
            .iter()
            .map(|f| FailureRow {
                property: f.property.clone(),
                reason: f.reason.clone(),
            })
            .collect();
        Ok(format!(
            "{} {} check failure(s)\n{}\n",
            "✗".red(),
            response.failures.len(),
            Table::new(rows)
        ))
    }

    /// Formats a diff response.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_diff(&self, response: &DiffResponse) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(response);
        }
        if !response.has_changes() {
            return Ok(format!("{} No changes\n", "✓".green()));
        }

        let rows: Vec<ChangeRow> = response
            .detailed_diff
            .iter()
            .map(|(key, diff)| ChangeRow {
                property: key.clone(),
                change: Self::format_kind(diff.kind),
            })
            .collect();

        let mut output = String::new();
        let _ = writeln!(output, "{}", Table::new(rows));
        if response.replaces.is_empty() {
            let _ = writeln!(output, "\nUpdate in place");
        } else {
            let _ = writeln!(
                output,
                "\n{} replacement forced by: {}",
                "!".red(),
                response.replaces.join(", ")
            );
        }
        Ok(output)
    }

    /// Formats a create response.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_create(&self, response: &CreateResponse) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(response);
        }
        Ok(format!(
            "{} Created {}\n{}",
            "+".green(),
            Self::display_id(&response.id),
            Self::properties_table(&response.properties)
        ))
    }

    /// Formats a read response.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_read(&self, response: &ReadResponse) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(response);
        }
        if response.is_absent() {
            return Ok(format!("{} Resource no longer exists\n", "-".red()));
        }
        Ok(format!(
            "{} {}\n{}",
            "=".cyan(),
            response.id,
            Self::properties_table(&response.properties)
        ))
    }

    /// Formats an update response.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_update(&self, response: &UpdateResponse) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(response);
        }
        Ok(format!(
            "{} Updated\n{}",
            "~".yellow(),
            Self::properties_table(&response.properties)
        ))
    }

    /// Formats a completed delete.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_delete(&self, id: &str) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&serde_json::json!({}));
        }
        Ok(format!("{} Deleted {id}\n", "-".red()))
    }

    /// Formats a partially initialized resource.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_partial(
        &self,
        id: &str,
        properties: &PropertyMap,
        reasons: &[String],
    ) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&PartialJson {
                id,
                properties,
                reasons,
            });
        }
        let mut output = format!(
            "{} Created {} but initialization did not finish\n",
            "⚠".yellow(),
            id
        );
        for reason in reasons {
            let _ = writeln!(output, "   - {reason}");
        }
        output.push_str(&Self::properties_table(properties));
        Ok(output)
    }

    /// Formats a list of resource type tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_types(&self, types: &[&str]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(&types);
        }
        let mut output = String::new();
        for token in types {
            let _ = writeln!(output, "{token}");
        }
        Ok(output)
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        let mut output = serde_json::to_string_pretty(value)?;
        output.push('\n');
        Ok(output)
    }

    fn display_id(id: &str) -> String {
        if id.is_empty() {
            "(preview)".dimmed().to_string()
        } else {
            id.bold().to_string()
        }
    }

    fn properties_table(props: &PropertyMap) -> String {
        if props.is_empty() {
            return String::new();
        }
        let rows: Vec<PropertyRow> = props
            .iter()
            .map(|(key, value)| PropertyRow {
                key: key.clone(),
                value: Self::truncate(&Self::render_value(value), 60),
            })
            .collect();
        format!("{}\n", Table::new(rows))
    }

    /// Renders a value for a table cell. Secrets are never shown.
    fn render_value(value: &PropertyValue) -> String {
        match value {
            PropertyValue::Secret(_) => "[secret]".dimmed().to_string(),
            PropertyValue::Computed => "(computed)".dimmed().to_string(),
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Asset(_) => "(asset)".to_string(),
            PropertyValue::Archive(_) => "(archive)".to_string(),
            PropertyValue::Null => String::new(),
            PropertyValue::Array(_) | PropertyValue::Object(_) if Self::contains_secret(value) => {
                "[contains secrets]".dimmed().to_string()
            }
            PropertyValue::Array(_) | PropertyValue::Object(_) => {
                serde_json::to_string(value).unwrap_or_default()
            }
        }
    }

    fn contains_secret(value: &PropertyValue) -> bool {
        match value {
            PropertyValue::Secret(_) => true,
            PropertyValue::Array(items) => items.iter().any(Self::contains_secret),
            PropertyValue::Object(map) => map.iter().any(|(_, v)| Self::contains_secret(v)),
            _ => false,
        }
    }

    /// Formats a diff kind with color.
    fn format_kind(kind: PropertyDiffKind) -> String {
        match kind {
            PropertyDiffKind::Add => "+add".green().to_string(),
            PropertyDiffKind::Delete => "-delete".red().to_string(),
            PropertyDiffKind::Update => "~update".yellow().to_string(),
            PropertyDiffKind::AddReplace => "+add (replace)".red().bold().to_string(),
            PropertyDiffKind::DeleteReplace => "-delete (replace)".red().bold().to_string(),
            PropertyDiffKind::UpdateReplace => "~update (replace)".red().bold().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
