//! The command interpreter: dispatcher, block executor, modal registry and
//! host entry points.
//!
//! One `Interpreter` owns the scene it renders into, the state store, and
//! the registries that tie interactive nodes back to command sequences.
//! Hosts drive it re-entrantly: `execute` renders a sequence, `activate`
//! fires a trigger (which executes its bound sequence, which may build
//! further triggers, recursively), widget events capture input into state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use flux_scene::{Node, NodeId, NodeKind, Scene};
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use log::{debug, warn};

use crate::clock::{Clock, TestClock};
use crate::command::{Command, Directive};
use crate::persistence::PersistenceBackend;
use crate::state::{LOOP_INDEX_KEY, StateStore};
use crate::value::Value;

/// Which of the two top-level views is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    Main,
    Frame,
}

/// Host-side widget interaction delivered to `widget_event`.
#[derive(Clone, Debug)]
pub enum WidgetEvent {
    /// Text control edited to the given content.
    Edited(String),
    /// Toggle flipped.
    Toggled(bool),
    /// Radio or dropdown option picked.
    Selected(String),
    /// Checkbox option checked or unchecked.
    Checked { option: String, checked: bool },
}

/// Commands and targets bound to an interactive node when it was built.
#[derive(Clone, Debug, Default)]
struct TriggerBinding {
    on_click: Vec<Command>,
    form_id: Option<String>,
    modal: Option<String>,
    url: Option<String>,
}

/// Environment-provided collaborators and host anchor switches.
///
/// Every anchor is optional; a disabled anchor silently disables the
/// feature depending on it.
pub struct HostConfig {
    pub user_id: Option<String>,
    pub backend: Option<Arc<dyn PersistenceBackend>>,
    pub clock: Arc<dyn Clock>,
    pub with_main_output: bool,
    pub with_dynamic_output: bool,
    pub with_frame_view: bool,
    pub with_alert: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            backend: None,
            clock: Arc::new(TestClock::new()),
            with_main_output: true,
            with_dynamic_output: true,
            with_frame_view: true,
            with_alert: true,
        }
    }
}

/// Host anchor nodes mounted at construction.
struct Anchors {
    main: Option<NodeId>,
    dynamic_output: Option<NodeId>,
    frame_view: Option<NodeId>,
    frame: Option<NodeId>,
    alert: Option<NodeId>,
}

pub struct Interpreter {
    scene: Scene,
    state: StateStore,
    root: NodeId,
    anchors: Anchors,
    /// One overlay per distinct modal id ever created.
    modals: IndexMap<String, NodeId>,
    triggers: HashMap<NodeId, TriggerBinding>,
    view: ViewMode,
    user_id: Option<String>,
    backend: Option<Arc<dyn PersistenceBackend>>,
    clock: Arc<dyn Clock>,
}

impl Interpreter {
    pub fn new(config: HostConfig) -> Self {
        let mut scene = Scene::new();
        let root = scene.insert(NodeKind::Region { name: "root".into() });

        let main = config.with_main_output.then(|| {
            scene.insert_into(root, NodeKind::Region { name: "main-output".into() })
        });
        let dynamic_output = config.with_dynamic_output.then(|| {
            scene.insert_into(root, NodeKind::Region { name: "dynamic-output".into() })
        });
        let (frame_view, frame) = if config.with_frame_view {
            let view = scene.insert_into(root, NodeKind::Region { name: "frame-view".into() });
            scene.set_hidden(view, true);
            let frame = scene.insert_into(view, NodeKind::Frame { url: String::new() });
            (Some(view), Some(frame))
        } else {
            (None, None)
        };
        let alert = config.with_alert.then(|| {
            let overlay = scene.insert_into(
                root,
                NodeKind::Overlay { title: "Alert".into(), text: String::new() },
            );
            scene.set_hidden(overlay, true);
            overlay
        });

        Self {
            scene,
            state: StateStore::new(),
            root,
            anchors: Anchors { main, dynamic_output, frame_view, frame, alert },
            modals: IndexMap::new(),
            triggers: HashMap::new(),
            view: ViewMode::Main,
            user_id: config.user_id,
            backend: config.backend,
            clock: config.clock,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn main_output(&self) -> Option<NodeId> {
        self.anchors.main
    }

    pub fn dynamic_output(&self) -> Option<NodeId> {
        self.anchors.dynamic_output
    }

    pub fn frame_view(&self) -> Option<NodeId> {
        self.anchors.frame_view
    }

    pub fn alert_overlay(&self) -> Option<NodeId> {
        self.anchors.alert
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateStore {
        &mut self.state
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Overlay node registered under a modal id.
    pub fn modal(&self, id: &str) -> Option<NodeId> {
        self.modals.get(id).copied()
    }

    pub fn modal_count(&self) -> usize {
        self.modals.len()
    }

    /// Execute a command sequence against the main output container.
    pub async fn run(&mut self, commands: Vec<Command>) {
        let target = self.anchors.main.unwrap_or(self.root);
        self.execute(commands, target).await;
    }

    /// Execute commands in order against `container`, strictly
    /// sequentially: a command never starts until the previous command's
    /// entire (possibly nested, possibly async) effect has resolved.
    ///
    /// Boxed so triggers can re-enter it from inside a running sequence at
    /// arbitrary depth.
    pub fn execute<'a>(
        &'a mut self,
        commands: Vec<Command>,
        container: NodeId,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            for command in commands {
                self.dispatch(command, container).await;
            }
        })
    }

    /// Dispatch a single command: interpolate its top-level string props,
    /// parse the typed directive, then build a node or perform the side
    /// effect.
    pub async fn dispatch(&mut self, mut command: Command, container: NodeId) {
        for value in command.props.values_mut() {
            if let Value::Text(text) = value {
                *value = Value::text(self.state.interpolate(text));
            }
        }
        let element_id = command.opt_text_prop("id");

        match Directive::parse(&command) {
            Directive::Heading { text, level } => {
                self.append_node(NodeKind::Heading { text, level }, element_id, container);
            }
            Directive::Paragraph { text } => {
                self.append_node(NodeKind::Paragraph { text }, element_id, container);
            }
            Directive::Badge { text, color } => {
                self.append_node(NodeKind::Badge { text, color }, element_id, container);
            }
            Directive::Divider => {
                self.append_node(NodeKind::Divider, element_id, container);
            }
            Directive::Alert { severity, text } => {
                self.append_node(NodeKind::Alert { severity, text }, element_id, container);
            }
            Directive::Card { title, text } => {
                let node = self.append_node(NodeKind::Card { title, text }, element_id, container);
                // A card's own command block renders inside it; forms are
                // cards whose descendants are input controls.
                if !command.commands.is_empty() {
                    self.execute(command.commands.clone(), node).await;
                }
            }
            Directive::List { title, ordered, items } => {
                self.append_node(NodeKind::List { title, ordered, items }, element_id, container);
            }
            Directive::Table { headers, rows } => {
                self.append_node(NodeKind::Table { headers, rows }, element_id, container);
            }
            Directive::Button { label, on_click, modal } => {
                let node = self.append_node(
                    NodeKind::Button { label, busy: false, disabled: false },
                    element_id,
                    container,
                );
                self.triggers.insert(
                    node,
                    TriggerBinding { on_click, modal, ..TriggerBinding::default() },
                );
            }
            Directive::Submit { label, form_id, on_click } => {
                let node = self.append_node(
                    NodeKind::Button { label, busy: false, disabled: false },
                    element_id,
                    container,
                );
                self.triggers.insert(
                    node,
                    TriggerBinding {
                        on_click,
                        form_id: Some(form_id),
                        ..TriggerBinding::default()
                    },
                );
            }
            Directive::Link { label, url, on_click } => {
                let node = self.append_node(
                    NodeKind::Link { label, url: url.clone() },
                    element_id,
                    container,
                );
                self.triggers.insert(
                    node,
                    TriggerBinding { on_click, url, ..TriggerBinding::default() },
                );
            }
            Directive::Iframe { url } => match url {
                Some(url) => self.show_frame(&url),
                None => self.show_alert("Iframe command requires a url"),
            },
            Directive::Progress { percent } => {
                self.append_node(NodeKind::Progress { percent }, element_id, container);
            }
            Directive::CircularProgress { percent } => {
                self.append_node(NodeKind::circular_progress(percent), element_id, container);
            }
            Directive::Input { placeholder } => {
                self.append_node(
                    NodeKind::Input { placeholder, value: String::new() },
                    element_id,
                    container,
                );
            }
            Directive::Textarea { placeholder, rows } => {
                self.append_node(
                    NodeKind::Textarea { placeholder, rows, value: String::new() },
                    element_id,
                    container,
                );
            }
            Directive::Toggle { label } => {
                self.append_node(NodeKind::Toggle { label, on: false }, element_id, container);
            }
            Directive::RadioGroup { name, options } => {
                self.append_node(
                    NodeKind::RadioGroup { name, options, selected: None },
                    element_id,
                    container,
                );
            }
            Directive::CheckboxGroup { name, options } => {
                self.append_node(
                    NodeKind::CheckboxGroup { name, options, checked: Vec::new() },
                    element_id,
                    container,
                );
            }
            Directive::Dropdown { name, options } => {
                self.append_node(
                    NodeKind::Dropdown { name, options, selected: None },
                    element_id,
                    container,
                );
            }
            Directive::Modal { id, title, text } => {
                if let Some(&overlay) = self.modals.get(&id) {
                    self.scene.set_hidden(overlay, false);
                } else {
                    let overlay = self.scene.insert(NodeKind::Overlay { title, text });
                    self.scene.node_mut(overlay).element_id = Some(id.clone());
                    self.scene.set_hidden(overlay, true);
                    self.scene.append(self.root, overlay);
                    self.modals.insert(id, overlay);
                }
            }
            Directive::Store { id, value } => {
                let Some(user_id) = self.user_id.clone() else {
                    warn!("store: no authenticated user, skipping \"{id}\"");
                    return;
                };
                let Some(backend) = self.backend.clone() else {
                    warn!("store: persistence backend not initialized, skipping \"{id}\"");
                    return;
                };
                if let Err(error) = backend.store_field(&user_id, &id, &value).await {
                    warn!("store: failed to persist \"{id}\": {error}");
                }
            }
            Directive::Load { id } => {
                let Some(user_id) = self.user_id.clone() else {
                    warn!("load: no authenticated user, skipping \"{id}\"");
                    return;
                };
                let Some(backend) = self.backend.clone() else {
                    warn!("load: persistence backend not initialized, skipping \"{id}\"");
                    return;
                };
                match backend.load_field(&user_id, &id).await {
                    Ok(Some(value)) => {
                        self.state.insert(id, value);
                    }
                    Ok(None) => {
                        warn!("load: field \"{id}\" not found for user {user_id}");
                    }
                    Err(error) => {
                        warn!("load: failed to read \"{id}\": {error}");
                    }
                }
            }
            Directive::Show { id } => self.set_element_hidden(&id, false),
            Directive::Hide { id } => self.set_element_hidden(&id, true),
            Directive::Wait { seconds } => {
                if seconds.is_finite() && seconds > 0.0 {
                    self.clock.sleep(Duration::from_secs_f64(seconds)).await;
                }
            }
            Directive::Carousel { images } => {
                self.append_node(NodeKind::Carousel { images, active: 0 }, element_id, container);
            }
            Directive::Chart(spec) => {
                self.append_node(NodeKind::Chart(spec), element_id, container);
            }
            Directive::Loop { count, body } => {
                for index in 0..count {
                    self.state.insert(LOOP_INDEX_KEY, Value::number(index as f64));
                    self.execute(body.clone(), container).await;
                }
            }
            Directive::Unrecognized { kind } => {
                warn!("unknown command type: {kind}");
            }
        }
    }

    /// Fire an interactive node. For command-bound triggers this disables
    /// the control, runs the bound sequence against the dynamic output
    /// container to completion, then restores the control, regardless of
    /// anything the nested sequence did or failed to do.
    pub async fn activate(&mut self, trigger: NodeId) {
        let Some(binding) = self.triggers.get(&trigger).cloned() else {
            debug!("activate: node without a trigger binding");
            return;
        };
        if let NodeKind::Button { disabled: true, .. } = self.scene.node(trigger).kind {
            debug!("activate: trigger is disabled while its sequence runs");
            return;
        }

        if let Some(modal_id) = &binding.modal {
            match self.modals.get(modal_id).copied() {
                Some(overlay) => self.scene.set_hidden(overlay, false),
                None => self.show_alert(&format!("Modal \"{modal_id}\" not found")),
            }
            return;
        }

        if binding.on_click.is_empty() {
            if let Some(url) = &binding.url {
                self.show_frame(url);
            }
            return;
        }

        if let Some(form_id) = &binding.form_id {
            let snapshot = self.collect_form_values(form_id);
            self.state.insert(form_id.clone(), snapshot);
        }

        self.set_trigger_busy(trigger, true);
        let target = self.anchors.dynamic_output.unwrap_or(self.root);
        self.execute(binding.on_click, target).await;
        self.set_trigger_busy(trigger, false);
    }

    /// Deliver a widget interaction: updates the node descriptor and writes
    /// the control's current value into state under its id (text controls,
    /// toggles) or group name (option groups).
    pub fn widget_event(&mut self, node_id: NodeId, event: WidgetEvent) {
        let node = self.scene.node_mut(node_id);
        let element_id = node.element_id.clone();
        match (&mut node.kind, event) {
            (
                NodeKind::Input { value, .. } | NodeKind::Textarea { value, .. },
                WidgetEvent::Edited(text),
            ) => {
                *value = text.clone();
                match element_id {
                    Some(key) => self.state.insert(key, Value::text(text)),
                    None => debug!("edit on a control without an id is not captured"),
                }
            }
            (NodeKind::Toggle { on, .. }, WidgetEvent::Toggled(flag)) => {
                *on = flag;
                match element_id {
                    Some(key) => self.state.insert(key, Value::Bool(flag)),
                    None => debug!("toggle without an id is not captured"),
                }
            }
            (
                NodeKind::RadioGroup { name, selected, .. }
                | NodeKind::Dropdown { name, selected, .. },
                WidgetEvent::Selected(option),
            ) => {
                *selected = Some(option.clone());
                let key = name.clone();
                if key.is_empty() {
                    debug!("selection in an unnamed group is not captured");
                } else {
                    self.state.insert(key, Value::text(option));
                }
            }
            (
                NodeKind::CheckboxGroup { name, checked, .. },
                WidgetEvent::Checked { option, checked: is_checked },
            ) => {
                if is_checked {
                    if !checked.contains(&option) {
                        checked.push(option);
                    }
                } else {
                    checked.retain(|existing| existing != &option);
                }
                let key = name.clone();
                let items = checked.iter().map(|item| Value::text(item.clone())).collect();
                if key.is_empty() {
                    debug!("check in an unnamed group is not captured");
                } else {
                    self.state.insert(key, Value::List(items));
                }
            }
            (kind, event) => {
                debug!("widget event {event:?} ignored for {} node", kind.tag());
            }
        }
    }

    /// Advance a carousel by `delta` slides with wraparound.
    pub fn carousel_step(&mut self, node_id: NodeId, delta: i32) {
        let node = self.scene.node_mut(node_id);
        if let NodeKind::Carousel { images, active } = &mut node.kind {
            if images.is_empty() {
                return;
            }
            let count = images.len() as i64;
            *active = (*active as i64 + delta as i64).rem_euclid(count) as usize;
        }
    }

    /// Reveal the host alert overlay with the given message; without the
    /// alert anchor the message only reaches the log.
    pub fn show_alert(&mut self, message: &str) {
        match self.anchors.alert {
            Some(overlay) => {
                if let NodeKind::Overlay { text, .. } = &mut self.scene.node_mut(overlay).kind {
                    *text = message.to_string();
                }
                self.scene.set_hidden(overlay, false);
            }
            None => warn!("alert: {message}"),
        }
    }

    pub fn dismiss_alert(&mut self) {
        if let Some(overlay) = self.anchors.alert {
            self.scene.set_hidden(overlay, true);
        }
    }

    /// Switch to the embedded frame view showing `url`.
    pub fn show_frame(&mut self, url: &str) {
        let (Some(view), Some(frame)) = (self.anchors.frame_view, self.anchors.frame) else {
            debug!("frame view not mounted, ignoring navigation to {url}");
            return;
        };
        self.scene.node_mut(frame).kind = NodeKind::Frame { url: url.to_string() };
        self.scene.set_hidden(view, false);
        if let Some(main) = self.anchors.main {
            self.scene.set_hidden(main, true);
        }
        self.view = ViewMode::Frame;
    }

    /// Switch back to the main rendered output.
    pub fn show_main(&mut self) {
        if let Some(view) = self.anchors.frame_view {
            self.scene.set_hidden(view, true);
        }
        if let Some(main) = self.anchors.main {
            self.scene.set_hidden(main, false);
        }
        self.view = ViewMode::Main;
    }

    /// Hide a revealed modal overlay again.
    pub fn close_modal(&mut self, id: &str) {
        if let Some(&overlay) = self.modals.get(id) {
            self.scene.set_hidden(overlay, true);
        }
    }

    fn append_node(
        &mut self,
        kind: NodeKind,
        element_id: Option<String>,
        container: NodeId,
    ) -> NodeId {
        let id = self.scene.insert(kind);
        if element_id.is_some() {
            self.scene.node_mut(id).element_id = element_id;
        }
        self.scene.append(container, id);
        id
    }

    fn set_element_hidden(&mut self, element_id: &str, hidden: bool) {
        match self.scene.find_element(element_id) {
            Some(node) => self.scene.set_hidden(node, hidden),
            None => debug!("no element \"{element_id}\" to {}", if hidden { "hide" } else { "show" }),
        }
    }

    fn set_trigger_busy(&mut self, trigger: NodeId, busy_now: bool) {
        if let NodeKind::Button { busy, disabled, .. } = &mut self.scene.node_mut(trigger).kind {
            *busy = busy_now;
            *disabled = busy_now;
        }
    }

    /// Snapshot every input/textarea descendant of the form element into a
    /// flat object keyed by element id.
    fn collect_form_values(&self, form_id: &str) -> Value {
        let mut fields = BTreeMap::new();
        let Some(form) = self.scene.find_element(form_id) else {
            return Value::Object(fields);
        };
        for id in self.scene.subtree(form) {
            let node: &Node = self.scene.node(id);
            let Some(element_id) = &node.element_id else {
                continue;
            };
            if let NodeKind::Input { value, .. } | NodeKind::Textarea { value, .. } = &node.kind {
                fields.insert(Arc::from(element_id.as_str()), Value::text(value.clone()));
            }
        }
        Value::Object(fields)
    }
}
