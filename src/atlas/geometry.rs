//! Geometric primitives for atlas layout.
//!
//! The guillotine tree is stored as an arena: nodes live in a `Vec` and refer
//! to their children by index.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in atlas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Check if a point lies inside the rectangle (right/bottom edges excluded).
    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        self.x <= x && x < self.right() && self.y <= y && y < self.bottom()
    }

    /// AABB intersection test. Rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Check whether `other` lies entirely within this rectangle.
    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

/// A node of the guillotine packing tree.
///
/// Once `used` is set, `right` and `down` (when present) cover the free space
/// left beside and below the placement.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub rect: Rectangle,
    pub used: bool,
    pub right: Option<usize>,
    pub down: Option<usize>,
}

impl LayoutNode {
    fn free(rect: Rectangle) -> Self {
        Self { rect, used: false, right: None, down: None }
    }
}

/// Arena-backed guillotine tree covering a single bin.
#[derive(Debug, Clone)]
pub struct GuillotineTree {
    nodes: Vec<LayoutNode>,
}

impl GuillotineTree {
    /// Create a tree whose root covers `width` x `height` at the origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self { nodes: vec![LayoutNode::free(Rectangle::new(0, 0, width, height))] }
    }

    pub fn root(&self) -> &LayoutNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> &LayoutNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the first free node large enough for `width` x `height`.
    ///
    /// Used nodes are searched right child first, then down child.
    pub fn find_node(&self, width: u32, height: u32) -> Option<usize> {
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.used {
                // Pushed in reverse so `right` is explored before `down`.
                if let Some(down) = node.down {
                    stack.push(down);
                }
                if let Some(right) = node.right {
                    stack.push(right);
                }
            } else if node.rect.fits(width, height) {
                return Some(index);
            }
        }
        None
    }

    /// Mark a node used and split off the remaining strips.
    ///
    /// `right` spans the full node height beside the placement; `down` spans
    /// the placement width below it. Empty strips are not created.
    pub fn split_node(&mut self, index: usize, width: u32, height: u32) -> Rectangle {
        let rect = self.nodes[index].rect;

        let right = (rect.width > width).then(|| {
            self.push(Rectangle::new(rect.x + width, rect.y, rect.width - width, rect.height))
        });
        let down = (rect.height > height).then(|| {
            self.push(Rectangle::new(rect.x, rect.y + height, width, rect.height - height))
        });

        let node = &mut self.nodes[index];
        node.used = true;
        node.right = right;
        node.down = down;

        Rectangle::new(rect.x, rect.y, width, height)
    }

    /// Find a node for the item and split it, returning the placed rectangle.
    pub fn insert(&mut self, width: u32, height: u32) -> Option<Rectangle> {
        let index = self.find_node(width, height)?;
        Some(self.split_node(index, width, height))
    }

    fn push(&mut self, rect: Rectangle) -> usize {
        self.nodes.push(LayoutNode::free(rect));
        self.nodes.len() - 1
    }
}

/// Get the next power of two >= n
pub fn next_power_of_two(n: u32) -> u32 {
    if n == 0 {
        return 1;
    }
    n.next_power_of_two()
}

pub fn is_power_of_two(n: u32) -> bool {
    n > 0 && n & (n - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_edges() {
        let rect = Rectangle::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert_eq!(rect.area(), 1200);
    }

    #[test]
    fn test_contains_point_excludes_far_edges() {
        let rect = Rectangle::new(0, 0, 10, 10);
        assert!(rect.contains_point(0, 0));
        assert!(rect.contains_point(9, 9));
        assert!(!rect.contains_point(10, 5));
        assert!(!rect.contains_point(5, 10));
    }

    #[test]
    fn test_intersects() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, 5, 10, 10);
        let touching = Rectangle::new(10, 0, 10, 10);
        let far = Rectangle::new(50, 50, 1, 1);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&touching));
        assert!(!a.intersects(&far));
    }

    #[test]
    fn test_split_tiles_original_rect() {
        let mut tree = GuillotineTree::new(100, 80);
        let placed = tree.split_node(0, 30, 20);
        assert_eq!(placed, Rectangle::new(0, 0, 30, 20));

        let root = tree.root();
        assert!(root.used);
        let right = tree.node(root.right.unwrap()).rect;
        let down = tree.node(root.down.unwrap()).rect;

        assert_eq!(right, Rectangle::new(30, 0, 70, 80));
        assert_eq!(down, Rectangle::new(0, 20, 30, 60));
        assert!(!right.intersects(&down));
        assert!(!right.intersects(&placed));
        assert!(!down.intersects(&placed));
        assert_eq!(placed.area() + right.area() + down.area(), 100 * 80);
    }

    #[test]
    fn test_split_exact_fit_creates_no_children() {
        let mut tree = GuillotineTree::new(16, 16);
        tree.split_node(0, 16, 16);
        assert!(tree.root().right.is_none());
        assert!(tree.root().down.is_none());
        assert_eq!(tree.len(), 1);
        assert!(tree.find_node(1, 1).is_none());
    }

    #[test]
    fn test_find_node_prefers_right_strip() {
        let mut tree = GuillotineTree::new(64, 64);
        tree.insert(32, 32).unwrap();
        let second = tree.insert(32, 32).unwrap();
        assert_eq!((second.x, second.y), (32, 0));
        let third = tree.insert(32, 32).unwrap();
        assert_eq!((third.x, third.y), (32, 32));
        let fourth = tree.insert(32, 32).unwrap();
        assert_eq!((fourth.x, fourth.y), (0, 32));
        assert!(tree.insert(1, 1).is_none());
    }

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(3), 4);
        assert_eq!(next_power_of_two(150), 256);
        assert_eq!(next_power_of_two(256), 256);
        assert_eq!(next_power_of_two(257), 512);
    }

    #[test]
    fn test_is_power_of_two() {
        assert!(!is_power_of_two(0));
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(512));
        assert!(!is_power_of_two(66));
    }
}
