use super::{DrawCmd, SortKey, ZIndex};

/// A single draw item: sort key + command.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub key: SortKey,
    pub cmd: DrawCmd,
}

/// Recorded draw stream for a frame.
///
/// Performance characteristics:
/// - `push()` is O(1)
/// - paint-order iteration reuses an internal index buffer; no per-frame
///   allocation once warmed
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
    next_order: u32,

    sorted_indices: Vec<usize>,
    sorted_dirty: bool,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears recorded items. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.next_order = 0;
        self.sorted_dirty = true;
        self.sorted_indices.clear();
    }

    /// Returns items in insertion order.
    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Pushes a draw command with the given z-index.
    #[inline]
    pub fn push(&mut self, z: ZIndex, cmd: DrawCmd) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);

        self.items.push(DrawItem {
            key: SortKey::new(z, order),
            cmd,
        });

        self.sorted_dirty = true;
    }

    /// Returns indices into `items` in paint order (back-to-front).
    ///
    /// This buffer is owned by `DrawList` and reused across frames.
    pub fn indices_in_paint_order(&mut self) -> &[usize] {
        if self.sorted_dirty {
            self.rebuild_sorted_indices();
        }
        &self.sorted_indices
    }

    /// Iterates items in paint order without cloning draw commands.
    pub fn iter_in_paint_order(&mut self) -> impl Iterator<Item = &DrawItem> {
        if self.sorted_dirty {
            self.rebuild_sorted_indices();
        }

        self.sorted_indices.iter().map(|&i| &self.items[i])
    }

    fn rebuild_sorted_indices(&mut self) {
        self.sorted_indices.clear();
        self.sorted_indices.extend(0..self.items.len());

        // Stable ordering is ensured by SortKey including insertion order.
        self.sorted_indices
            .sort_by(|&a, &b| self.items[a].key.cmp(&self.items[b].key));

        self.sorted_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::paint::Color;
    use crate::scene::TextCmd;
    use crate::text::FontId;

    fn text_cmd(tag: &str) -> DrawCmd {
        DrawCmd::Text(TextCmd {
            text: tag.to_string(),
            font: FontId(0),
            size: 16.0,
            color: Color::WHITE,
            origin: Vec2::zero(),
            max_width: None,
        })
    }

    fn tag(item: &DrawItem) -> &str {
        match &item.cmd {
            DrawCmd::Text(t) => &t.text,
            _ => panic!("expected text cmd"),
        }
    }

    #[test]
    fn paint_order_sorts_by_z_then_insertion() {
        let mut list = DrawList::new();
        list.push(ZIndex::new(1), text_cmd("top"));
        list.push(ZIndex::new(0), text_cmd("back-a"));
        list.push(ZIndex::new(0), text_cmd("back-b"));

        let order: Vec<&str> = list.iter_in_paint_order().map(tag).collect();
        assert_eq!(order, ["back-a", "back-b", "top"]);
    }

    #[test]
    fn negative_z_draws_first() {
        let mut list = DrawList::new();
        list.push(ZIndex::new(0), text_cmd("mid"));
        list.push(ZIndex::new(-5), text_cmd("back"));

        let order: Vec<&str> = list.iter_in_paint_order().map(tag).collect();
        assert_eq!(order, ["back", "mid"]);
    }

    #[test]
    fn clear_resets_ordering_state() {
        let mut list = DrawList::new();
        list.push(ZIndex::new(3), text_cmd("a"));
        list.clear();
        assert!(list.items().is_empty());

        list.push(ZIndex::new(0), text_cmd("b"));
        let order: Vec<&str> = list.iter_in_paint_order().map(tag).collect();
        assert_eq!(order, ["b"]);
        // Insertion counter restarts after clear.
        assert_eq!(list.items()[0].key.order, 0);
    }

    #[test]
    fn paint_order_is_stable_across_rebuilds() {
        let mut list = DrawList::new();
        for i in 0..8 {
            list.push(ZIndex::new(0), text_cmd(&format!("{i}")));
        }
        let first: Vec<String> = list.iter_in_paint_order().map(|i| tag(i).to_string()).collect();
        list.push(ZIndex::new(-1), text_cmd("front-runner"));
        let second: Vec<String> = list.iter_in_paint_order().map(|i| tag(i).to_string()).collect();
        assert_eq!(second[0], "front-runner");
        assert_eq!(&second[1..], &first[..]);
    }
}
