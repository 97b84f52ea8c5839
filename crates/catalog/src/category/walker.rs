/// Depth-first, pre-order traversal over any tree shape.
///
/// The root itself is never visited; every other node is visited exactly
/// once together with its parent, parents before children and siblings in
/// order. The walker holds no state between walks.
pub struct TreeWalker<'a, T, F> {
    root: &'a T,
    children: F,
}

impl<'a, T, F> TreeWalker<'a, T, F>
where
    F: Fn(&'a T) -> &'a [T],
{
    /// Create a walker over `root`, reading child lists with `children`.
    pub const fn new(root: &'a T, children: F) -> Self {
        Self { root, children }
    }

    /// Invoke `visit(node, parent)` for every non-root node.
    pub fn walk_children(&self, mut visit: impl FnMut(&'a T, &'a T)) {
        let mut stack: Vec<(&'a T, &'a T)> = (self.children)(self.root)
            .iter()
            .rev()
            .map(|child| (child, self.root))
            .collect();

        while let Some((node, parent)) = stack.pop() {
            visit(node, parent);
            stack.extend((self.children)(node).iter().rev().map(|child| (child, node)));
        }
    }
}
