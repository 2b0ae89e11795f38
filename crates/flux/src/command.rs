//! Wire command model and its typed dispatch form.
//!
//! `Command` is the JSON-compatible descriptor a host page or remote
//! generator produces: `{type, props, commands?}`. `Directive` is the
//! per-kind tagged union the dispatcher matches on; parsing is total and
//! malformed props degrade to defaults instead of failing.

use flux_scene::{ChartSpec, Severity};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One transient command descriptor, consumed once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
}

impl Command {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// String prop, empty when missing or not text.
    pub fn text_prop(&self, name: &str) -> String {
        self.opt_text_prop(name).unwrap_or_default()
    }

    pub fn opt_text_prop(&self, name: &str) -> Option<String> {
        self.props.get(name).and_then(|v| match v {
            Value::Text(s) => Some(s.to_string()),
            _ => None,
        })
    }

    /// Float prop accepting both JSON numbers and numeric strings.
    pub fn f64_prop(&self, name: &str, default: f64) -> f64 {
        match self.props.get(name) {
            Some(Value::Number(n)) => n.0,
            Some(Value::Text(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Base-10 integer prop; fractional inputs truncate toward zero.
    pub fn i64_prop(&self, name: &str, default: i64) -> i64 {
        match self.props.get(name) {
            Some(Value::Number(n)) => n.0.trunc() as i64,
            Some(Value::Text(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                    .unwrap_or(default)
            }
            _ => default,
        }
    }

    /// String list prop: a JSON list is taken item by item; a string is
    /// split on commas with each piece trimmed.
    pub fn string_list_prop(&self, name: &str) -> Vec<String> {
        match self.props.get(name) {
            Some(Value::List(items)) => {
                items.iter().map(Value::to_display_string).collect()
            }
            Some(Value::Text(s)) if !s.is_empty() => {
                s.split(',').map(|item| item.trim().to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Numeric list prop, same list-or-comma-string tolerance.
    pub fn f64_list_prop(&self, name: &str) -> Vec<f64> {
        match self.props.get(name) {
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Number(n) => n.0,
                    Value::Text(s) => s.trim().parse().unwrap_or(0.0),
                    _ => 0.0,
                })
                .collect(),
            Some(Value::Text(s)) if !s.is_empty() => s
                .split(',')
                .map(|item| item.trim().parse().unwrap_or(0.0))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Table rows: a list of lists of cells. Non-list rows are skipped;
    /// ragged rows are kept as-is.
    pub fn rows_prop(&self, name: &str) -> Vec<Vec<String>> {
        let Some(Value::List(rows)) = self.props.get(name) else {
            return Vec::new();
        };
        rows.iter()
            .filter_map(|row| {
                row.as_list()
                    .map(|cells| cells.iter().map(Value::to_display_string).collect())
            })
            .collect()
    }

    /// Nested command sequence carried in a prop (e.g. `onClick`).
    /// Malformed entries are dropped.
    pub fn commands_prop(&self, name: &str) -> Vec<Command> {
        let Some(Value::List(items)) = self.props.get(name) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                serde_json::from_value(serde_json::Value::from(item)).ok()
            })
            .collect()
    }
}

/// Typed form of one command, one variant per kind.
///
/// Parsing never fails: unknown tags land in `Unrecognized` and malformed
/// props fall back to their documented defaults.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    Heading { text: String, level: u8 },
    Paragraph { text: String },
    Badge { text: String, color: String },
    Divider,
    Alert { severity: Severity, text: String },
    Card { title: String, text: String },
    List { title: String, ordered: bool, items: Vec<String> },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    Button { label: String, on_click: Vec<Command>, modal: Option<String> },
    Submit { label: String, form_id: String, on_click: Vec<Command> },
    Link { label: String, url: Option<String>, on_click: Vec<Command> },
    Iframe { url: Option<String> },
    Progress { percent: f64 },
    CircularProgress { percent: f64 },
    Input { placeholder: String },
    Textarea { placeholder: String, rows: u32 },
    Toggle { label: String },
    RadioGroup { name: String, options: Vec<String> },
    CheckboxGroup { name: String, options: Vec<String> },
    Dropdown { name: String, options: Vec<String> },
    Modal { id: String, title: String, text: String },
    Store { id: String, value: Value },
    Load { id: String },
    Show { id: String },
    Hide { id: String },
    Wait { seconds: f64 },
    Carousel { images: Vec<String> },
    Chart(ChartSpec),
    Loop { count: i64, body: Vec<Command> },
    Unrecognized { kind: String },
}

impl Directive {
    pub fn parse(command: &Command) -> Directive {
        match command.kind.as_str() {
            "heading" => Directive::Heading {
                text: command.text_prop("text"),
                level: command.i64_prop("level", 2).clamp(1, 6) as u8,
            },
            "paragraph" => Directive::Paragraph {
                text: command.text_prop("text"),
            },
            "badge" => Directive::Badge {
                text: command.text_prop("text"),
                color: command
                    .opt_text_prop("color")
                    .unwrap_or_else(|| "default".to_string()),
            },
            "divider" => Directive::Divider,
            "alert" => Directive::Alert {
                severity: Severity::parse(&command.text_prop("severity")),
                text: command.text_prop("text"),
            },
            "card" => Directive::Card {
                title: command.text_prop("title"),
                text: command.text_prop("text"),
            },
            "list" => Directive::List {
                title: command.text_prop("title"),
                ordered: command.opt_text_prop("listStyle").as_deref() == Some("numbered"),
                items: command.string_list_prop("items"),
            },
            "table" => Directive::Table {
                headers: command.string_list_prop("headers"),
                rows: command.rows_prop("rows"),
            },
            "button" => Directive::Button {
                label: trigger_label(command, "Button"),
                on_click: command.commands_prop("onClick"),
                modal: command.opt_text_prop("modal"),
            },
            "submit" => Directive::Submit {
                label: trigger_label(command, "Submit"),
                form_id: command.text_prop("formId"),
                on_click: command.commands_prop("onClick"),
            },
            "link" => Directive::Link {
                label: trigger_label(command, "Link"),
                url: command.opt_text_prop("url"),
                on_click: command.commands_prop("onClick"),
            },
            "iframe" => Directive::Iframe {
                url: command.opt_text_prop("url"),
            },
            "progress" => Directive::Progress {
                percent: percent_prop(command),
            },
            "circular-progress" => Directive::CircularProgress {
                percent: percent_prop(command),
            },
            "input" => Directive::Input {
                placeholder: command.text_prop("placeholder"),
            },
            "textarea" => Directive::Textarea {
                placeholder: command.text_prop("placeholder"),
                rows: command.i64_prop("rows", 4).max(1) as u32,
            },
            "toggle" => Directive::Toggle {
                label: command.text_prop("label"),
            },
            "radio-group" => Directive::RadioGroup {
                name: group_name(command),
                options: command.string_list_prop("options"),
            },
            "checkbox-group" => Directive::CheckboxGroup {
                name: group_name(command),
                options: command.string_list_prop("options"),
            },
            "dropdown" => Directive::Dropdown {
                name: group_name(command),
                options: command.string_list_prop("options"),
            },
            "modal" => Directive::Modal {
                id: command
                    .opt_text_prop("id")
                    .unwrap_or_else(|| "modal".to_string()),
                title: command.text_prop("title"),
                text: command.text_prop("text"),
            },
            "store" => Directive::Store {
                id: command.text_prop("id"),
                value: command.prop("value").cloned().unwrap_or(Value::Unit),
            },
            "load" => Directive::Load {
                id: command.text_prop("id"),
            },
            "show" => Directive::Show {
                id: command.text_prop("id"),
            },
            "hide" => Directive::Hide {
                id: command.text_prop("id"),
            },
            "wait" => Directive::Wait {
                seconds: command.f64_prop("seconds", 0.0),
            },
            "carousel" => Directive::Carousel {
                images: command.string_list_prop("images"),
            },
            "chart" => Directive::Chart(ChartSpec {
                kind: command
                    .opt_text_prop("chartType")
                    .or_else(|| command.opt_text_prop("type"))
                    .unwrap_or_else(|| "bar".to_string()),
                labels: command.string_list_prop("labels"),
                values: command.f64_list_prop("data"),
                colors: command.string_list_prop("colors"),
            }),
            "loop" => Directive::Loop {
                count: command.i64_prop("count", 0).max(0),
                body: command.commands.clone(),
            },
            other => Directive::Unrecognized {
                kind: other.to_string(),
            },
        }
    }
}

fn trigger_label(command: &Command, fallback: &str) -> String {
    command
        .opt_text_prop("label")
        .or_else(|| command.opt_text_prop("text"))
        .unwrap_or_else(|| fallback.to_string())
}

/// State key of an option group: `name` prop, falling back to `id`.
fn group_name(command: &Command) -> String {
    command
        .opt_text_prop("name")
        .or_else(|| command.opt_text_prop("id"))
        .unwrap_or_default()
}

/// Displayed fraction from `value`/`max`, clamped to `[0, 100]`.
fn percent_prop(command: &Command) -> f64 {
    let value = command.f64_prop("value", 0.0);
    let max = command.f64_prop("max", 100.0);
    if max > 0.0 {
        (value / max * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(json: serde_json::Value) -> Command {
        serde_json::from_value(json).expect("command json")
    }

    #[test]
    fn command_deserializes_with_defaults() {
        let cmd = command(serde_json::json!({"type": "divider"}));
        assert_eq!(cmd.kind, "divider");
        assert!(cmd.props.is_empty());
        assert!(cmd.commands.is_empty());
    }

    #[test]
    fn numeric_props_accept_strings() {
        let cmd = command(serde_json::json!({
            "type": "progress",
            "props": {"value": "42.5", "max": 100}
        }));
        assert_eq!(cmd.f64_prop("value", 0.0), 42.5);
        assert_eq!(cmd.i64_prop("value", 0), 42);
        assert_eq!(cmd.i64_prop("missing", 7), 7);
        assert_eq!(cmd.f64_prop("max", 0.0), 100.0);
    }

    #[test]
    fn string_list_accepts_list_or_comma_string() {
        let cmd = command(serde_json::json!({
            "type": "list",
            "props": {"items": " a , b,c "}
        }));
        assert_eq!(cmd.string_list_prop("items"), vec!["a", "b", "c"]);

        let cmd = command(serde_json::json!({
            "type": "list",
            "props": {"items": ["a", 2]}
        }));
        assert_eq!(cmd.string_list_prop("items"), vec!["a", "2"]);
    }

    #[test]
    fn progress_percent_clamps() {
        let cmd = command(serde_json::json!({
            "type": "progress",
            "props": {"value": 150, "max": 100}
        }));
        assert_eq!(Directive::parse(&cmd), Directive::Progress { percent: 100.0 });

        let cmd = command(serde_json::json!({
            "type": "progress",
            "props": {"value": 5, "max": 0}
        }));
        assert_eq!(Directive::parse(&cmd), Directive::Progress { percent: 0.0 });
    }

    #[test]
    fn on_click_prop_parses_nested_commands() {
        let cmd = command(serde_json::json!({
            "type": "button",
            "props": {
                "label": "Go",
                "onClick": [{"type": "paragraph", "props": {"text": "done"}}]
            }
        }));
        let Directive::Button { on_click, .. } = Directive::parse(&cmd) else {
            panic!("expected button directive")
        };
        assert_eq!(on_click.len(), 1);
        assert_eq!(on_click[0].kind, "paragraph");
    }

    #[test]
    fn loop_reads_count_and_body() {
        let cmd = command(serde_json::json!({
            "type": "loop",
            "props": {"count": "3"},
            "commands": [{"type": "divider"}]
        }));
        let Directive::Loop { count, body } = Directive::parse(&cmd) else {
            panic!("expected loop directive")
        };
        assert_eq!(count, 3);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn unknown_kind_parses_as_unrecognized() {
        let cmd = command(serde_json::json!({"type": "hologram"}));
        assert_eq!(
            Directive::parse(&cmd),
            Directive::Unrecognized { kind: "hologram".to_string() }
        );
    }
}
