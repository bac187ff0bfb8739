//! Suggestion panel and loading indicator fragments.

use crate::dom::{Document, NodeId};
use crate::model::RefinementResult;

pub const PANEL_CLASS: &str = "fromptly-suggestions";
pub const SUGGESTION_CLASS: &str = "fromptly-suggestion";
pub const OPTION_CLASS: &str = "fromptly-option";
pub const LOADING_CLASS: &str = "fromptly-loading";
pub const FADE_OUT_CLASS: &str = "fromptly-fade-out";

/// Node handles of a rendered panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelNodes {
    pub root: NodeId,
    pub suggestion: NodeId,
    pub options: Vec<(NodeId, String)>,
}

/// Build a detached panel: one suggestion block, one button per option.
pub fn build_panel(doc: &mut Document, result: &RefinementResult) -> PanelNodes {
    let root = doc.create_element("div");
    doc.add_class(root, PANEL_CLASS);

    let suggestion = doc.create_element("div");
    doc.add_class(suggestion, SUGGESTION_CLASS);
    doc.set_attr(suggestion, "role", "button");
    doc.set_attr(suggestion, "title", "Apply suggestion");
    let text = doc.create_text(&result.suggestion);
    doc.append_child(suggestion, text);
    doc.append_child(root, suggestion);

    let options = result
        .options
        .iter()
        .filter(|o| !o.trim().is_empty())
        .enumerate()
        .map(|(index, option)| {
            let button = doc.create_element("button");
            doc.add_class(button, OPTION_CLASS);
            doc.set_attr(button, "data-option-index", &index.to_string());
            let label = doc.create_text(&format!("+ {}", option));
            doc.append_child(button, label);
            doc.append_child(root, button);
            (button, option.clone())
        })
        .collect();

    PanelNodes {
        root,
        suggestion,
        options,
    }
}

pub fn build_loading(doc: &mut Document) -> NodeId {
    let root = doc.create_element("div");
    doc.add_class(root, LOADING_CLASS);
    doc.set_attr(root, "aria-busy", "true");
    let text = doc.create_text("Refining your prompt...");
    doc.append_child(root, text);
    root
}

/// Append an option to the prompt as a bullet line.
pub fn append_bullet(current: &str, option: &str) -> String {
    let base = current.trim_end();
    if base.is_empty() {
        format!("- {}", option)
    } else {
        format!("{}\n- {}", base, option)
    }
}
