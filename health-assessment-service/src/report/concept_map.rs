//! Concept map: a two-level hierarchy summarising the analysis, laid out as a
//! horizontal tidy tree and drawn as SVG.

use serde::Serialize;

use crate::models::HealthAnalysis;

const VIEW_WIDTH: f64 = 800.0;
const VIEW_HEIGHT: f64 = 600.0;
/// Room left for labels around the tree.
const MARGIN_LEFT: f64 = 100.0;
const MARGIN_TOP: f64 = 50.0;
const BREADTH_EXTENT: f64 = VIEW_HEIGHT - 100.0;
const DEPTH_EXTENT: f64 = VIEW_WIDTH - 200.0;

const MAX_SYMPTOMS: usize = 5;
const MAX_CONDITIONS: usize = 3;
const MAX_ACTIONS: usize = 4;
const MAX_RED_FLAGS: usize = 3;
const LABEL_CHARS: usize = 30;

const LINK_COLOR: &str = "#cbd5e1";
const WARNING_COLOR: &str = "#ef4444";
const ROOT_COLOR: &str = "#3b82f6";
const BRANCH_COLOR: &str = "#64748b";
const LEAF_COLOR: &str = "#10b981";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Branch,
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptNode {
    pub label: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub warning: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConceptNode>,
}

impl ConceptNode {
    fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            warning: false,
            children: Vec::new(),
        }
    }

    fn branch(label: &str, children: Vec<ConceptNode>) -> Self {
        Self {
            children,
            ..Self::new(label, NodeKind::Branch)
        }
    }

    fn leaf(label: impl Into<String>) -> Self {
        Self::new(label, NodeKind::Leaf)
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn color(&self) -> &'static str {
        if self.warning {
            return WARNING_COLOR;
        }
        match self.kind {
            NodeKind::Root => ROOT_COLOR,
            NodeKind::Branch => BRANCH_COLOR,
            NodeKind::Leaf => LEAF_COLOR,
        }
    }
}

fn shorten(text: &str) -> String {
    if text.chars().count() <= LABEL_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(LABEL_CHARS).collect();
    short.push_str("...");
    short
}

pub fn concept_tree(analysis: &HealthAnalysis) -> ConceptNode {
    let symptoms = analysis
        .extracted_symptoms
        .iter()
        .take(MAX_SYMPTOMS)
        .map(ConceptNode::leaf)
        .collect();

    let possibilities = analysis
        .conditions
        .iter()
        .take(MAX_CONDITIONS)
        .map(|c| ConceptNode::leaf(&c.name).with_detail(&c.likelihood))
        .collect();

    let risk = vec![
        ConceptNode::leaf(analysis.risk_score.to_string()).with_detail(&analysis.risk_explanation),
    ];

    let actions = analysis
        .self_care_steps
        .iter()
        .take(MAX_ACTIONS)
        .map(|step| ConceptNode::leaf(shorten(step)))
        .collect();

    let red_flags = analysis
        .red_flags
        .iter()
        .take(MAX_RED_FLAGS)
        .map(|flag| ConceptNode {
            warning: true,
            ..ConceptNode::leaf(shorten(flag))
        })
        .collect();

    ConceptNode {
        children: vec![
            ConceptNode::branch("Symptoms", symptoms),
            ConceptNode::branch("Possibilities", possibilities),
            ConceptNode::branch("Risk Level", risk),
            ConceptNode::branch("Actions", actions),
            ConceptNode::branch("Red Flags", red_flags),
        ],
        ..ConceptNode::new("Analysis Overview", NodeKind::Root)
    }
}

/// A node with its position inside the translated drawing area.
/// `x` runs with depth (left to right), `y` with breadth.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode<'a> {
    pub node: &'a ConceptNode,
    pub parent: Option<usize>,
    pub x: f64,
    pub y: f64,
}

struct Cursor {
    /// Breadth and parent of the last leaf placed.
    last_leaf: Option<(f64, Option<usize>)>,
}

fn place<'a>(
    node: &'a ConceptNode,
    depth: usize,
    parent: Option<usize>,
    cursor: &mut Cursor,
    out: &mut Vec<(PlacedNode<'a>, usize)>,
) -> f64 {
    let index = out.len();
    out.push((
        PlacedNode {
            node,
            parent,
            x: 0.0,
            y: 0.0,
        },
        depth,
    ));

    let breadth = if node.children.is_empty() {
        // siblings sit one unit apart, cousins two
        let breadth = match cursor.last_leaf {
            None => 0.0,
            Some((last, last_parent)) if last_parent == parent => last + 1.0,
            Some((last, _)) => last + 2.0,
        };
        cursor.last_leaf = Some((breadth, parent));
        breadth
    } else {
        let positions: Vec<f64> = node
            .children
            .iter()
            .map(|child| place(child, depth + 1, Some(index), cursor, out))
            .collect();
        let first = positions.first().copied().unwrap_or_default();
        let last = positions.last().copied().unwrap_or_default();
        (first + last) / 2.0
    };

    out[index].0.y = breadth;
    breadth
}

/// Tidy tree layout: leaves spaced evenly in order, each parent centred over
/// its children, then scaled into the drawing area.
pub fn layout(root: &ConceptNode) -> Vec<PlacedNode<'_>> {
    let mut placed = Vec::new();
    place(
        root,
        0,
        None,
        &mut Cursor { last_leaf: None },
        &mut placed,
    );

    let (mut left, mut right) = (0, 0);
    for (i, (node, _)) in placed.iter().enumerate() {
        if node.y < placed[left].0.y {
            left = i;
        }
        if node.y > placed[right].0.y {
            right = i;
        }
    }
    let pad = if placed[left].0.parent == placed[right].0.parent {
        0.5
    } else {
        1.0
    };
    let min = placed[left].0.y;
    let span = placed[right].0.y - min + 2.0 * pad;
    let max_depth = placed.iter().map(|(_, depth)| *depth).max().unwrap_or(0).max(1);

    placed
        .into_iter()
        .map(|(mut node, depth)| {
            node.y = (node.y - min + pad) * BREADTH_EXTENT / span;
            node.x = depth as f64 * DEPTH_EXTENT / max_depth as f64;
            node
        })
        .collect()
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_svg(analysis: &HealthAnalysis) -> String {
    let tree = concept_tree(analysis);
    let nodes = layout(&tree);

    let links: String = nodes
        .iter()
        .filter_map(|node| {
            let parent = &nodes[node.parent?];
            let mid = (parent.x + node.x) / 2.0;
            Some(format!(
                r#"<path class="link" fill="none" stroke="{LINK_COLOR}" stroke-width="2" d="M{:.1},{:.1}C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}"/>
"#,
                parent.x, parent.y, mid, parent.y, mid, node.y, node.x, node.y
            ))
        })
        .collect();

    let circles: String = nodes.iter().map(render_node).collect();

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {VIEW_WIDTH} {VIEW_HEIGHT}" font-family="sans-serif">
<g transform="translate({MARGIN_LEFT},{MARGIN_TOP})">
{links}{circles}</g>
</svg>
"#
    )
}

fn render_node(placed: &PlacedNode<'_>) -> String {
    let node = placed.node;
    let label = escape_xml(&node.label);
    let (offset, anchor) = if node.children.is_empty() {
        (10, "start")
    } else {
        (-10, "end")
    };
    let title = node
        .detail
        .as_ref()
        .map(|detail| format!("<title>{}</title>", escape_xml(detail)))
        .unwrap_or_default();

    format!(
        r#"<g class="node" transform="translate({x:.1},{y:.1})">
<circle r="6" fill="{color}">{title}</circle>
<text dy="0.31em" x="{offset}" text-anchor="{anchor}" stroke="white" stroke-width="3">{label}</text>
<text dy="0.31em" x="{offset}" text-anchor="{anchor}">{label}</text>
</g>
"#,
        x = placed.x,
        y = placed.y,
        color = node.color(),
    )
}
