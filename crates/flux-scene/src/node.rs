//! Node descriptors: one `NodeKind` variant per rendered element.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::scene::NodeId;

/// Radius of the circular progress dial. The stroke dash offset is derived
/// from the circumference of a circle with this radius.
pub const DIAL_RADIUS: f64 = 45.0;

/// Alert severity. Unknown severities fall back to `Default`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Default,
}

impl Severity {
    pub fn parse(text: &str) -> Self {
        match text {
            "success" => Severity::Success,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Default,
        }
    }

    /// Style-class token the renderer maps to its alert buckets.
    pub fn class(&self) -> &'static str {
        match self {
            Severity::Success => "alert-success",
            Severity::Warning => "alert-warning",
            Severity::Error => "alert-error",
            Severity::Default => "alert-default",
        }
    }
}

/// Descriptor handed to the external charting collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

/// The kind of scene node and its kind-specific descriptor payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Plain container (host anchors and grouping).
    Region { name: String },
    Heading { text: String, level: u8 },
    Paragraph { text: String },
    Badge { text: String, color: String },
    Divider,
    Alert { severity: Severity, text: String },
    Card { title: String, text: String },
    List { title: String, ordered: bool, items: Vec<String> },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    /// Interactive trigger. `busy` replaces the label with a loading
    /// indicator while a bound command sequence is running.
    Button { label: String, busy: bool, disabled: bool },
    Link { label: String, url: Option<String> },
    /// Inner host of the embedded frame view.
    Frame { url: String },
    Progress { percent: f64 },
    CircularProgress { percent: f64, dash_offset: f64 },
    Input { placeholder: String, value: String },
    Textarea { placeholder: String, rows: u32, value: String },
    Toggle { label: String, on: bool },
    RadioGroup { name: String, options: Vec<String>, selected: Option<String> },
    CheckboxGroup { name: String, options: Vec<String>, checked: Vec<String> },
    Dropdown { name: String, options: Vec<String>, selected: Option<String> },
    /// Modal overlay chrome: title, text and a close control.
    Overlay { title: String, text: String },
    Carousel { images: Vec<String>, active: usize },
    Chart(ChartSpec),
}

impl NodeKind {
    /// Circular progress descriptor with the dash offset precomputed from
    /// the fixed-radius dial circumference.
    pub fn circular_progress(percent: f64) -> Self {
        let circumference = 2.0 * std::f64::consts::PI * DIAL_RADIUS;
        NodeKind::CircularProgress {
            percent,
            dash_offset: circumference - percent / 100.0 * circumference,
        }
    }

    /// Short tag used by text renderers and diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Region { .. } => "region",
            NodeKind::Heading { .. } => "heading",
            NodeKind::Paragraph { .. } => "paragraph",
            NodeKind::Badge { .. } => "badge",
            NodeKind::Divider => "divider",
            NodeKind::Alert { .. } => "alert",
            NodeKind::Card { .. } => "card",
            NodeKind::List { .. } => "list",
            NodeKind::Table { .. } => "table",
            NodeKind::Button { .. } => "button",
            NodeKind::Link { .. } => "link",
            NodeKind::Frame { .. } => "frame",
            NodeKind::Progress { .. } => "progress",
            NodeKind::CircularProgress { .. } => "circular-progress",
            NodeKind::Input { .. } => "input",
            NodeKind::Textarea { .. } => "textarea",
            NodeKind::Toggle { .. } => "toggle",
            NodeKind::RadioGroup { .. } => "radio-group",
            NodeKind::CheckboxGroup { .. } => "checkbox-group",
            NodeKind::Dropdown { .. } => "dropdown",
            NodeKind::Overlay { .. } => "overlay",
            NodeKind::Carousel { .. } => "carousel",
            NodeKind::Chart(_) => "chart",
        }
    }
}

/// A single node in the scene tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Element identifier assigned from the command's `id` prop; `show`,
    /// `hide` and form snapshots look nodes up by it.
    pub element_id: Option<String>,
    pub kind: NodeKind,
    pub hidden: bool,
    pub children: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            element_id: None,
            kind,
            hidden: false,
            children: SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parse_falls_back_to_default() {
        assert_eq!(Severity::parse("success"), Severity::Success);
        assert_eq!(Severity::parse("warning"), Severity::Warning);
        assert_eq!(Severity::parse("error"), Severity::Error);
        assert_eq!(Severity::parse("info"), Severity::Default);
        assert_eq!(Severity::parse(""), Severity::Default);
    }

    #[test]
    fn circular_progress_dash_offset() {
        let circumference = 2.0 * std::f64::consts::PI * DIAL_RADIUS;

        let NodeKind::CircularProgress { percent, dash_offset } =
            NodeKind::circular_progress(0.0)
        else {
            panic!("expected circular progress")
        };
        assert_eq!(percent, 0.0);
        assert_eq!(dash_offset, circumference);

        let NodeKind::CircularProgress { dash_offset, .. } =
            NodeKind::circular_progress(100.0)
        else {
            panic!("expected circular progress")
        };
        assert!(dash_offset.abs() < 1e-9);
    }
}
