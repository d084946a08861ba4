use super::types::{MindMap, Node};

/// Renders a map as a Markdown outline: the root as `#`, first-level ideas as
/// `##`, deeper ideas as nested bullets.
pub fn to_markdown(map: &MindMap) -> String {
    let mut out = String::new();
    write_node(&map.root, 0, &mut out);
    out
}

fn write_node(node: &Node, depth: usize, out: &mut String) {
    match depth {
        0 => {
            out.push_str(&format!("# {}\n\n", node.text));
        }
        1 => {
            out.push_str(&format!("## {}\n\n", node.text));
        }
        _ => {
            out.push_str(&"  ".repeat(depth - 1));
            out.push_str(&format!("- {}\n", node.text));
        }
    }

    if node.children.is_empty() {
        return;
    }
    for child in &node.children {
        write_node(child, depth + 1, out);
    }
    // A blank line closes every nested list.
    if depth > 0 {
        out.push('\n');
    }
}

/// A file name for the export derived from the map title.
pub fn file_name(title: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "mindmap.md".to_string()
    } else {
        format!("{}.md", safe)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mindmap::testing::scenario_tree;

    fn map_with(root: Node) -> MindMap {
        MindMap {
            root: Arc::new(root),
            ..MindMap::new()
        }
    }

    #[test]
    fn outline_uses_headings_then_bullets() {
        let mut root = scenario_tree();
        let mut a1 = Node::clone(&root.children[0].children[0]);
        a1.children.push(Arc::new(Node::new("deep".into(), "Deep")));
        let mut a = Node::clone(&root.children[0]);
        a.children[0] = Arc::new(a1);
        root.children[0] = Arc::new(a);

        let markdown = to_markdown(&map_with(root));
        assert_eq!(
            markdown,
            "# Central Idea\n\n## A\n\n  - A1\n    - Deep\n\n\n## B\n\n"
        );
    }

    #[test]
    fn lone_root_is_a_single_heading() {
        let markdown = to_markdown(&map_with(Node::new("r".into(), "Solo")));
        assert_eq!(markdown, "# Solo\n\n");
    }

    #[test]
    fn file_name_is_download_safe() {
        assert_eq!(file_name("My New Mind Map"), "my_new_mind_map.md");
        assert_eq!(file_name("Q3: Plans/Ideas"), "q3__plans_ideas.md");
        assert_eq!(file_name(""), "mindmap.md");
    }
}
