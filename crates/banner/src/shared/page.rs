use super::dom::{BannerAction, Node};

/// The page body the banner is injected into.
pub trait Page {
    /// Inserts `nodes` before the body's current first child, keeping their order.
    fn prepend_to_body(&mut self, nodes: Vec<Node>);

    /// Removes every element carrying `class`, subtree included. Returns how many were removed.
    fn remove_by_class(&mut self, class: &str) -> usize;

    fn count_by_class(&self, class: &str) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPage {
    body: Vec<Node>,
}

impl InMemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: Vec<Node>) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &[Node] {
        &self.body
    }

    /// Activatable controls currently on the page, in document order.
    pub fn actions(&self) -> Vec<BannerAction> {
        self.body
            .iter()
            .filter_map(Node::as_element)
            .flat_map(|el| el.descendants())
            .filter_map(|el| el.action)
            .collect()
    }

    pub fn to_html(&self) -> String {
        let inner: String = self.body.iter().map(Node::to_html).collect();
        format!("<body>{}</body>", inner)
    }
}

impl Page for InMemoryPage {
    fn prepend_to_body(&mut self, nodes: Vec<Node>) {
        self.body.splice(0..0, nodes);
    }

    fn remove_by_class(&mut self, class: &str) -> usize {
        remove_matching(&mut self.body, class)
    }

    fn count_by_class(&self, class: &str) -> usize {
        self.body
            .iter()
            .filter_map(Node::as_element)
            .flat_map(|el| el.descendants())
            .filter(|el| el.has_class(class))
            .count()
    }
}

fn remove_matching(nodes: &mut Vec<Node>, class: &str) -> usize {
    let before = nodes.len();
    nodes.retain(|n| !matches!(n, Node::Element(el) if el.has_class(class)));
    let mut removed = before - nodes.len();
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            removed += remove_matching(&mut el.children, class);
        }
    }
    removed
}
