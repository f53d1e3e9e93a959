//! Agent replies are markdown; the dashboard shows them as HTML.

use pulldown_cmark::{html, Options, Parser};
use serde_json::Value;

/// Keys whose string values are agent prose. Each gains a `<key>_html`
/// sibling when a response is decorated.
const PROSE_FIELDS: &[&str] = &[
    "planning_details",
    "progress_report",
    "standup_summary",
    "resolution",
    "escalation",
    "report",
    "retrospective",
    "inspect_and_adapt",
    "response",
    "developer_response",
    "reply",
    "approach",
    "guidance",
    "conclusion",
    "message",
];

pub fn to_html(text: &str) -> String {
    let parser = Parser::new_ext(
        text,
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
    );
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Walk `value` and add rendered siblings for prose fields and for
/// `thought_process` step lists.
pub fn decorate(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                decorate(child);
            }
            let mut rendered = Vec::new();
            for key in PROSE_FIELDS {
                if let Some(text) = map.get(*key).and_then(Value::as_str) {
                    rendered.push((format!("{key}_html"), Value::String(to_html(text))));
                }
            }
            if let Some(Value::Array(steps)) = map.get("thought_process") {
                let steps = steps
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| Value::String(to_html(s)))
                    .collect();
                rendered.push(("thought_process_html".to_string(), Value::Array(steps)));
            }
            map.extend(rendered);
        }
        Value::Array(items) => items.iter_mut().for_each(decorate),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_emphasis_and_lists() {
        let html = to_html("**Goal**\n\n- one\n- two");
        assert!(html.contains("<strong>Goal</strong>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn decorate_adds_siblings_at_any_depth() {
        let mut value = json!({
            "retrospective": "*good*",
            "resolutions": [{ "resolution": "fix it", "impediment": "VPN" }],
            "pi_number": 1
        });
        decorate(&mut value);
        assert_eq!(value["retrospective_html"], "<p><em>good</em></p>\n");
        assert_eq!(value["resolutions"][0]["resolution_html"], "<p>fix it</p>\n");
        assert!(value["resolutions"][0].get("impediment_html").is_none());
        assert!(value.get("pi_number_html").is_none());
    }

    #[test]
    fn decorate_renders_reasoning_steps() {
        let mut value = json!({ "thought_process": ["a", "b"], "conclusion": "c" });
        decorate(&mut value);
        assert_eq!(value["thought_process_html"][1], "<p>b</p>\n");
        assert_eq!(value["conclusion_html"], "<p>c</p>\n");
    }
}
