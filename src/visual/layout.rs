use std::fmt::Write;
use crate::tree::{TaskId, TaskStatus, TaskTree};
use crate::visual::summary::SummaryCache;

pub const NODE_WIDTH: f64 = 120.0;
pub const NODE_HEIGHT: f64 = 80.0;
pub const LEVEL_OFFSET: f64 = 150.0;
pub const SIBLING_OFFSET: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Blue,
    Green,
}

impl Color {
    pub fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::NotStarted => Color::Red,
            TaskStatus::InProgress => Color::Blue,
            TaskStatus::Complete => Color::Green,
        }
    }

    pub fn as_svg(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: TaskId,
    pub x: f64,
    pub y: f64,
    pub color: Color,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEdge {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
}

impl Scene {
    pub fn node(&self, id: TaskId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_svg(&self) -> String {
        let width = self.nodes.iter().map(|n| n.x + NODE_WIDTH).fold(NODE_WIDTH, f64::max) + 10.0;
        let height = self.nodes.iter().map(|n| n.y + NODE_HEIGHT).fold(NODE_HEIGHT, f64::max) + 10.0;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        for edge in &self.edges {
            let _ = writeln!(
                svg,
                r#"  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="black"/>"#,
                edge.from.0, edge.from.1, edge.to.0, edge.to.1
            );
        }
        for node in &self.nodes {
            let _ = writeln!(
                svg,
                r#"  <ellipse cx="{}" cy="{}" rx="{}" ry="{}" fill="{}"/>"#,
                node.x + NODE_WIDTH / 2.0,
                node.y + NODE_HEIGHT / 2.0,
                NODE_WIDTH / 2.0,
                NODE_HEIGHT / 2.0,
                node.color.as_svg()
            );
            let _ = writeln!(
                svg,
                r#"  <text x="{}" y="{}" font-size="9">{}</text>"#,
                node.x + 10.0,
                node.y + 30.0,
                escape(&node.label)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Places each node at a horizontal offset per depth and a vertical offset
/// per sibling index relative to its parent.
pub fn layout(tree: &TaskTree, summaries: &SummaryCache, max_chars: usize) -> Scene {
    let mut scene = Scene::default();
    place(tree, summaries, max_chars, tree.root(), 0.0, 0.0, &mut scene);
    scene
}

fn place(tree: &TaskTree, summaries: &SummaryCache, max_chars: usize, id: TaskId, x: f64, y: f64, scene: &mut Scene) {
    let Ok(task) = tree.get(id) else { return };
    let label = summaries.get(id, task).unwrap_or(task.prompt.as_str());
    scene.nodes.push(SceneNode {
        id,
        x,
        y,
        color: Color::for_status(task.status),
        label: truncate(label, max_chars),
    });

    for (i, child) in tree.children(id).iter().enumerate() {
        let child_x = x + LEVEL_OFFSET;
        let child_y = y + i as f64 * SIBLING_OFFSET;
        place(tree, summaries, max_chars, *child, child_x, child_y, scene);
        scene.edges.push(SceneEdge {
            from: (x + NODE_WIDTH, y + NODE_HEIGHT / 2.0),
            to: (child_x, child_y + NODE_HEIGHT / 2.0),
        });
    }
}
