use serde::Deserialize;

/// One node of an Atlassian Document Format (ADF) tree. Jira v3 returns
/// issue descriptions in this shape; only the type, the leaf text, and the
/// child list matter for flattening.
#[derive(Debug, Clone, Deserialize)]
pub struct AdfNode {
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Vec<AdfNode>,
}

/// A Jira description is either plain text (API v2) or an ADF document (v3).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JiraDescription {
    Text(String),
    Document(AdfNode),
}

impl JiraDescription {
    pub fn to_plain_text(&self) -> String {
        match self {
            JiraDescription::Text(text) => text.clone(),
            JiraDescription::Document(node) => flatten(node),
        }
    }
}

/// Depth-first concatenation of leaf text nodes. Paragraph and heading nodes
/// contribute a trailing space so adjacent blocks don't run together.
pub fn flatten(root: &AdfNode) -> String {
    fn walk(node: &AdfNode, out: &mut String) {
        if node.node_type == "text" {
            if let Some(text) = &node.text {
                out.push_str(text);
            }
            return;
        }
        for child in &node.content {
            walk(child, out);
        }
        if node.node_type == "paragraph" || node.node_type == "heading" {
            out.push(' ');
        }
    }

    let mut out = String::new();
    walk(root, &mut out);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> AdfNode {
        AdfNode {
            node_type: "text".to_string(),
            text: Some(s.to_string()),
            content: vec![],
        }
    }

    fn block(node_type: &str, children: Vec<AdfNode>) -> AdfNode {
        AdfNode {
            node_type: node_type.to_string(),
            text: None,
            content: children,
        }
    }

    #[test]
    fn test_flatten_paragraphs_with_separator() {
        let doc = block(
            "doc",
            vec![
                block("paragraph", vec![text("First block.")]),
                block("paragraph", vec![text("Second block.")]),
            ],
        );
        assert_eq!(flatten(&doc), "First block. Second block.");
    }

    #[test]
    fn test_flatten_nested_marks() {
        let doc = block(
            "doc",
            vec![block(
                "paragraph",
                vec![
                    text("As a user I want "),
                    block("strong", vec![text("login")]),
                    text(" support"),
                ],
            )],
        );
        assert_eq!(flatten(&doc), "As a user I want login support");
    }

    #[test]
    fn test_flatten_heading_then_list() {
        let doc = block(
            "doc",
            vec![
                block("heading", vec![text("Acceptance")]),
                block(
                    "bulletList",
                    vec![block(
                        "listItem",
                        vec![block("paragraph", vec![text("works offline")])],
                    )],
                ),
            ],
        );
        assert_eq!(flatten(&doc), "Acceptance works offline");
    }

    #[test]
    fn test_plain_string_description_passes_through() {
        let json = r#""just plain text""#;
        let desc: JiraDescription = serde_json::from_str(json).unwrap();
        assert_eq!(desc.to_plain_text(), "just plain text");
    }

    #[test]
    fn test_adf_description_deserializes() {
        let json = r#"{"type":"doc","version":1,"content":[{"type":"paragraph","content":[{"type":"text","text":"hello"}]}]}"#;
        let desc: JiraDescription = serde_json::from_str(json).unwrap();
        assert_eq!(desc.to_plain_text(), "hello");
    }
}
