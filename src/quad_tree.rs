//! Region quad-tree over axis-aligned boxes.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to their children by
//! index. Each node's four children overlap: a child covers `ratio` of its
//! parent's width and height anchored at one corner, so boxes straddling
//! the center line can still descend. An item is stored in the deepest node
//! whose extent fully contains it; items not contained by the root stay in
//! the root.

use crate::basics::RectD;

pub const DEFAULT_MAX_DEPTH: u32 = 8;
pub const DEFAULT_RATIO: f64 = 0.55;

#[derive(Debug, Clone)]
struct Node {
    extent: RectD,
    items: Vec<usize>,
    children: [Option<usize>; 4],
}

impl Node {
    fn new(extent: RectD) -> Self {
        Self {
            extent,
            items: Vec::new(),
            children: [None; 4],
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    nodes: Vec<Node>,
    items: Vec<(RectD, T)>,
    max_depth: u32,
    ratio: f64,
}

impl<T> QuadTree<T> {
    pub fn new(extent: RectD) -> Self {
        Self::with_params(extent, DEFAULT_MAX_DEPTH, DEFAULT_RATIO)
    }

    pub fn with_params(extent: RectD, max_depth: u32, ratio: f64) -> Self {
        Self {
            nodes: vec![Node::new(extent)],
            items: Vec::new(),
            max_depth,
            ratio,
        }
    }

    pub fn extent(&self) -> &RectD {
        &self.nodes[0].extent
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop all items, keep the root extent.
    pub fn clear(&mut self) {
        let extent = *self.extent();
        self.nodes.clear();
        self.nodes.push(Node::new(extent));
        self.items.clear();
    }

    pub fn insert(&mut self, bbox: RectD, value: T) {
        let item = self.items.len();
        self.items.push((bbox, value));

        let mut node = 0;
        let mut depth = 0;
        'descend: while depth < self.max_depth {
            let quadrants = split_box(&self.nodes[node].extent, self.ratio);
            for (i, q) in quadrants.iter().enumerate() {
                if q.contains_rect(&bbox) {
                    node = match self.nodes[node].children[i] {
                        Some(child) => child,
                        None => {
                            let child = self.nodes.len();
                            self.nodes.push(Node::new(*q));
                            self.nodes[node].children[i] = Some(child);
                            child
                        }
                    };
                    depth += 1;
                    continue 'descend;
                }
            }
            break;
        }
        self.nodes[node].items.push(item);
    }

    /// Candidate items stored in every node whose extent intersects `bbox`.
    /// Candidates are not filtered by their own box.
    pub fn query(&self, bbox: RectD) -> QueryIter<'_, T> {
        QueryIter {
            tree: self,
            bbox,
            stack: vec![0],
            node: None,
            pos: 0,
        }
    }

    /// All items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(RectD, T)> {
        self.items.iter()
    }
}

/// Four overlapping corner quadrants, each `ratio` of the parent size.
fn split_box(ext: &RectD, ratio: f64) -> [RectD; 4] {
    let w = ext.width() * ratio;
    let h = ext.height() * ratio;
    [
        RectD::new(ext.x1, ext.y1, ext.x1 + w, ext.y1 + h),
        RectD::new(ext.x2 - w, ext.y1, ext.x2, ext.y1 + h),
        RectD::new(ext.x1, ext.y2 - h, ext.x1 + w, ext.y2),
        RectD::new(ext.x2 - w, ext.y2 - h, ext.x2, ext.y2),
    ]
}

pub struct QueryIter<'a, T> {
    tree: &'a QuadTree<T>,
    bbox: RectD,
    stack: Vec<usize>,
    node: Option<usize>,
    pos: usize,
}

impl<'a, T> Iterator for QueryIter<'a, T> {
    type Item = &'a (RectD, T);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            if let Some(n) = self.node {
                if let Some(&item) = tree.nodes[n].items.get(self.pos) {
                    self.pos += 1;
                    return Some(&tree.items[item]);
                }
                self.node = None;
            }
            let n = self.stack.pop()?;
            let node = &tree.nodes[n];
            // the root is always visited: it holds boxes outside its extent
            if n != 0 && !node.extent.intersects(&self.bbox) {
                continue;
            }
            self.stack.extend(node.children.iter().flatten().copied());
            self.node = Some(n);
            self.pos = 0;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
