//! End-to-end interpreter tests asserting on the descriptor tree.

use std::sync::Arc;

use flux::{
    Command, HostConfig, Interpreter, MemoryStorage, TestClock, Value, ViewMode, WidgetEvent,
};
use flux_scene::{NodeId, NodeKind};

fn commands(json: serde_json::Value) -> Vec<Command> {
    serde_json::from_value(json).expect("commands json")
}

fn interpreter() -> Interpreter {
    Interpreter::new(HostConfig::default())
}

fn kinds_in<'a>(interpreter: &'a Interpreter, container: NodeId) -> Vec<&'a NodeKind> {
    interpreter
        .scene()
        .node(container)
        .children
        .iter()
        .map(|id| &interpreter.scene().node(*id).kind)
        .collect()
}

fn main_kinds(interpreter: &Interpreter) -> Vec<&NodeKind> {
    kinds_in(interpreter, interpreter.main_output().expect("main output"))
}

fn dynamic_kinds(interpreter: &Interpreter) -> Vec<&NodeKind> {
    kinds_in(interpreter, interpreter.dynamic_output().expect("dynamic output"))
}

fn paragraph_texts(kinds: &[&NodeKind]) -> Vec<String> {
    kinds
        .iter()
        .filter_map(|kind| match kind {
            NodeKind::Paragraph { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn heading_interpolates_state() {
    let mut interpreter = interpreter();
    interpreter.state_mut().insert("greeting", Value::text("Hi"));
    interpreter
        .run(commands(serde_json::json!([
            {"type": "heading", "props": {"text": "{greeting}"}}
        ])))
        .await;

    assert_eq!(
        main_kinds(&interpreter),
        vec![&NodeKind::Heading { text: "Hi".into(), level: 2 }]
    );
}

#[tokio::test]
async fn undefined_placeholder_stays_verbatim() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "paragraph", "props": {"text": "hello {missing}"}}
        ])))
        .await;

    assert_eq!(
        paragraph_texts(&main_kinds(&interpreter)),
        vec!["hello {missing}"]
    );
}

#[tokio::test]
async fn loop_dispatches_body_with_loop_index() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "loop",
            "props": {"count": "3"},
            "commands": [{"type": "paragraph", "props": {"text": "{loopIndex}"}}]
        }])))
        .await;

    assert_eq!(paragraph_texts(&main_kinds(&interpreter)), vec!["0", "1", "2"]);
}

#[tokio::test]
async fn nested_loops_share_loop_index() {
    // The loop index is one shared state key with no save/restore across
    // nesting levels: after an inner loop finishes, the outer body reads
    // the inner loop's last index.
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "loop",
            "props": {"count": 2},
            "commands": [
                {
                    "type": "loop",
                    "props": {"count": 2},
                    "commands": [{"type": "paragraph", "props": {"text": "inner {loopIndex}"}}]
                },
                {"type": "paragraph", "props": {"text": "outer {loopIndex}"}}
            ]
        }])))
        .await;

    assert_eq!(
        paragraph_texts(&main_kinds(&interpreter)),
        vec!["inner 0", "inner 1", "outer 1", "inner 0", "inner 1", "outer 1"]
    );
}

#[tokio::test]
async fn unknown_command_appends_nothing() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "hologram", "props": {"text": "x"}},
            {"type": "divider"}
        ])))
        .await;

    // The unknown command is skipped, the sequence continues.
    assert_eq!(main_kinds(&interpreter), vec![&NodeKind::Divider]);
}

#[tokio::test]
async fn progress_clamps_to_one_hundred() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "progress", "props": {"value": 150, "max": 100}}
        ])))
        .await;

    assert_eq!(
        main_kinds(&interpreter),
        vec![&NodeKind::Progress { percent: 100.0 }]
    );
}

#[tokio::test]
async fn checkbox_group_accumulates_and_removes() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "checkbox-group", "props": {"name": "colors", "options": ["a", "b"]}}
        ])))
        .await;
    let group = interpreter.scene().node(interpreter.main_output().expect("main"))
        .children[0];

    interpreter.widget_event(group, WidgetEvent::Checked { option: "a".into(), checked: true });
    interpreter.widget_event(group, WidgetEvent::Checked { option: "b".into(), checked: true });
    interpreter.widget_event(group, WidgetEvent::Checked { option: "a".into(), checked: false });

    assert_eq!(
        interpreter.state().get("colors"),
        Some(&Value::List(vec![Value::text("b")]))
    );
}

#[tokio::test]
async fn modal_is_created_once_then_revealed() {
    let mut interpreter = interpreter();
    let modal = commands(serde_json::json!([
        {"type": "modal", "props": {"id": "m", "title": "T", "text": "body"}}
    ]));

    interpreter.run(modal.clone()).await;
    let overlay = interpreter.modal("m").expect("registered overlay");
    assert!(interpreter.scene().node(overlay).hidden);

    let nodes_before = interpreter.scene().len();
    interpreter.run(modal).await;

    assert_eq!(interpreter.modal_count(), 1);
    assert_eq!(interpreter.scene().len(), nodes_before);
    assert!(!interpreter.scene().node(overlay).hidden);
}

#[tokio::test]
async fn submit_snapshots_form_before_running_on_click() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "card",
            "props": {"id": "f", "title": "Signup"},
            "commands": [
                {"type": "input", "props": {"id": "name"}},
                {"type": "textarea", "props": {"id": "bio"}},
                {
                    "type": "submit",
                    "props": {
                        "id": "send",
                        "formId": "f",
                        "onClick": [{"type": "paragraph", "props": {"text": "{f}"}}]
                    }
                }
            ]
        }])))
        .await;

    let scene = interpreter.scene();
    let name = scene.find_element("name").expect("name input");
    let bio = scene.find_element("bio").expect("bio textarea");
    let send = scene.find_element("send").expect("submit button");

    interpreter.widget_event(name, WidgetEvent::Edited("Bob".into()));
    interpreter.widget_event(bio, WidgetEvent::Edited("hi".into()));
    interpreter.activate(send).await;

    assert_eq!(
        interpreter.state().get("f"),
        Some(&Value::object([
            ("bio", Value::text("hi")),
            ("name", Value::text("Bob")),
        ]))
    );
    // The bound sequence interpolated {f}: the snapshot was written first.
    assert_eq!(
        paragraph_texts(&dynamic_kinds(&interpreter)),
        vec![r#"{"bio":"hi","name":"Bob"}"#]
    );
}

#[tokio::test]
async fn trigger_restores_after_nested_failures() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "button",
            "props": {
                "id": "go",
                "label": "Go",
                "onClick": [
                    {"type": "hologram"},
                    {"type": "paragraph", "props": {"text": "after"}}
                ]
            }
        }])))
        .await;

    let button = interpreter.scene().find_element("go").expect("button");
    interpreter.activate(button).await;

    // The sequence continued past the unknown command and the trigger was
    // restored even though part of the sequence failed.
    assert_eq!(paragraph_texts(&dynamic_kinds(&interpreter)), vec!["after"]);
    assert_eq!(
        interpreter.scene().node(button).kind,
        NodeKind::Button { label: "Go".into(), busy: false, disabled: false }
    );
}

#[tokio::test]
async fn nested_triggers_re_enter_the_executor() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "button",
            "props": {
                "id": "outer",
                "onClick": [{
                    "type": "button",
                    "props": {
                        "id": "inner",
                        "onClick": [{"type": "paragraph", "props": {"text": "deep"}}]
                    }
                }]
            }
        }])))
        .await;

    let outer = interpreter.scene().find_element("outer").expect("outer");
    interpreter.activate(outer).await;
    let inner = interpreter.scene().find_element("inner").expect("inner");
    interpreter.activate(inner).await;

    assert_eq!(paragraph_texts(&dynamic_kinds(&interpreter)), vec!["deep"]);
}

#[tokio::test]
async fn wait_suspends_through_the_clock() {
    let clock = Arc::new(TestClock::new());
    let mut interpreter = Interpreter::new(HostConfig {
        clock: clock.clone(),
        ..HostConfig::default()
    });
    interpreter
        .run(commands(serde_json::json!([
            {"type": "wait", "props": {"seconds": "1.5"}},
            {"type": "wait", "props": {"seconds": "not a number"}}
        ])))
        .await;

    assert_eq!(clock.total_slept(), std::time::Duration::from_millis(1500));
}

#[tokio::test]
async fn store_and_load_round_trip_through_backend() {
    let storage = Arc::new(MemoryStorage::new());
    let mut interpreter = Interpreter::new(HostConfig {
        user_id: Some("u1".into()),
        backend: Some(storage.clone()),
        ..HostConfig::default()
    });

    interpreter
        .run(commands(serde_json::json!([
            {"type": "store", "props": {"id": "name", "value": "Bob"}},
            {"type": "store", "props": {"id": "score", "value": 7}}
        ])))
        .await;

    // Merge semantics: the second store left the first field untouched.
    let document = storage.document("u1").expect("document");
    assert_eq!(document.as_object().expect("object").len(), 2);

    interpreter
        .run(commands(serde_json::json!([
            {"type": "load", "props": {"id": "name"}},
            {"type": "load", "props": {"id": "ghost"}}
        ])))
        .await;

    assert_eq!(interpreter.state().get("name"), Some(&Value::text("Bob")));
    assert!(interpreter.state().get("ghost").is_none());
}

#[tokio::test]
async fn store_without_user_is_a_no_op() {
    let storage = Arc::new(MemoryStorage::new());
    let mut interpreter = Interpreter::new(HostConfig {
        backend: Some(storage.clone()),
        ..HostConfig::default()
    });

    interpreter
        .run(commands(serde_json::json!([
            {"type": "store", "props": {"id": "name", "value": "Bob"}}
        ])))
        .await;

    assert!(storage.document("u1").is_none());
}

#[tokio::test]
async fn show_and_hide_toggle_elements_by_id() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "heading", "props": {"id": "h", "text": "Hi"}},
            {"type": "hide", "props": {"id": "h"}},
            {"type": "hide", "props": {"id": "nobody"}}
        ])))
        .await;

    let heading = interpreter.scene().find_element("h").expect("heading");
    assert!(interpreter.scene().node(heading).hidden);

    interpreter
        .run(commands(serde_json::json!([{"type": "show", "props": {"id": "h"}}])))
        .await;
    assert!(!interpreter.scene().node(heading).hidden);
}

#[tokio::test]
async fn iframe_switches_to_the_frame_view() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "iframe", "props": {"url": "https://example.com"}}
        ])))
        .await;

    assert_eq!(interpreter.view(), ViewMode::Frame);
    let view = interpreter.frame_view().expect("frame view");
    assert!(!interpreter.scene().node(view).hidden);
    let frame = interpreter.scene().node(view).children[0];
    assert_eq!(
        interpreter.scene().node(frame).kind,
        NodeKind::Frame { url: "https://example.com".into() }
    );
    assert!(
        interpreter
            .scene()
            .node(interpreter.main_output().expect("main"))
            .hidden
    );
}

#[tokio::test]
async fn iframe_without_url_raises_the_host_alert() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{"type": "iframe"}])))
        .await;

    assert_eq!(interpreter.view(), ViewMode::Main);
    let alert = interpreter.alert_overlay().expect("alert overlay");
    assert!(!interpreter.scene().node(alert).hidden);
}

#[tokio::test]
async fn modal_button_reveals_or_alerts() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "modal", "props": {"id": "m", "title": "T"}},
            {"type": "button", "props": {"id": "open", "modal": "m"}},
            {"type": "button", "props": {"id": "broken", "modal": "nope"}}
        ])))
        .await;

    let overlay = interpreter.modal("m").expect("overlay");
    let open = interpreter.scene().find_element("open").expect("open");
    interpreter.activate(open).await;
    assert!(!interpreter.scene().node(overlay).hidden);

    let broken = interpreter.scene().find_element("broken").expect("broken");
    interpreter.activate(broken).await;
    let alert = interpreter.alert_overlay().expect("alert overlay");
    let alert_node = interpreter.scene().node(alert);
    assert!(!alert_node.hidden);
    assert_eq!(
        alert_node.kind,
        NodeKind::Overlay { title: "Alert".into(), text: "Modal \"nope\" not found".into() }
    );
}

#[tokio::test]
async fn carousel_wraps_in_both_directions() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {"type": "carousel", "props": {"images": "a.png, b.png, c.png"}}
        ])))
        .await;
    let carousel = interpreter.scene().node(interpreter.main_output().expect("main"))
        .children[0];

    interpreter.carousel_step(carousel, -1);
    let NodeKind::Carousel { active, .. } = interpreter.scene().node(carousel).kind else {
        panic!("expected carousel")
    };
    assert_eq!(active, 2);

    interpreter.carousel_step(carousel, 1);
    let NodeKind::Carousel { active, .. } = interpreter.scene().node(carousel).kind else {
        panic!("expected carousel")
    };
    assert_eq!(active, 0);
}

#[tokio::test]
async fn list_accepts_comma_separated_items() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "list",
            "props": {"title": "L", "items": " x , y ", "listStyle": "numbered"}
        }])))
        .await;

    assert_eq!(
        main_kinds(&interpreter),
        vec![&NodeKind::List {
            title: "L".into(),
            ordered: true,
            items: vec!["x".into(), "y".into()],
        }]
    );
}

#[tokio::test]
async fn link_role_depends_on_its_props() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([
            {
                "type": "link",
                "props": {
                    "id": "action",
                    "url": "https://example.com",
                    "onClick": [{"type": "paragraph", "props": {"text": "ran"}}]
                }
            },
            {"type": "link", "props": {"id": "nav", "url": "https://example.com"}}
        ])))
        .await;

    // onClick wins over url: the link acts as a trigger.
    let action = interpreter.scene().find_element("action").expect("action");
    interpreter.activate(action).await;
    assert_eq!(paragraph_texts(&dynamic_kinds(&interpreter)), vec!["ran"]);
    assert_eq!(interpreter.view(), ViewMode::Main);

    let nav = interpreter.scene().find_element("nav").expect("nav");
    interpreter.activate(nav).await;
    assert_eq!(interpreter.view(), ViewMode::Frame);
}

#[tokio::test]
async fn state_survives_across_executions() {
    let mut interpreter = interpreter();
    interpreter
        .run(commands(serde_json::json!([{
            "type": "loop",
            "props": {"count": 2},
            "commands": [{"type": "divider"}]
        }])))
        .await;

    // A later execution reads the stale index of the earlier one.
    interpreter
        .run(commands(serde_json::json!([
            {"type": "paragraph", "props": {"text": "last {loopIndex}"}}
        ])))
        .await;

    let texts = paragraph_texts(&main_kinds(&interpreter));
    assert_eq!(texts, vec!["last 1"]);
}
