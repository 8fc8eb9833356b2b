//! Shelf packer for the glyph atlas.
//!
//! Glyphs arrive in arbitrary sizes and are placed left-to-right into
//! rows ("shelves"); when a glyph does not fit the current row, a new row
//! starts below the tallest glyph seen so far. Placement is permanent:
//! the atlas never evicts, it only fills up.

/// Allocates rectangular regions inside a fixed-size square atlas.
#[derive(Debug)]
pub(super) struct AtlasAllocator {
    size: u32,
    padding: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    full: bool,
}

impl AtlasAllocator {
    pub(super) fn new(size: u32, padding: u32) -> Self {
        Self {
            size,
            padding,
            cursor_x: padding,
            cursor_y: padding,
            row_height: 0,
            full: false,
        }
    }

    /// Reserves a `w × h` region, returning its top-left corner.
    ///
    /// Returns `None` once the atlas cannot fit the region; after the first
    /// vertical overflow the allocator reports full permanently.
    pub(super) fn allocate(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if self.full || w == 0 || h == 0 {
            return None;
        }

        // Advance to a new shelf row when the region doesn't fit horizontally.
        if self.cursor_x + w + self.padding > self.size {
            self.cursor_y += self.row_height + self.padding;
            self.cursor_x = self.padding;
            self.row_height = 0;
        }

        if self.cursor_x + w + self.padding > self.size
            || self.cursor_y + h + self.padding > self.size
        {
            self.full = true;
            return None;
        }

        let origin = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + self.padding;
        self.row_height = self.row_height.max(h);
        Some(origin)
    }

    pub(super) fn is_full(&self) -> bool {
        self.full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_first_region_at_padding() {
        let mut a = AtlasAllocator::new(64, 1);
        assert_eq!(a.allocate(10, 10), Some((1, 1)));
    }

    #[test]
    fn packs_left_to_right_with_padding() {
        let mut a = AtlasAllocator::new(64, 1);
        assert_eq!(a.allocate(10, 10), Some((1, 1)));
        assert_eq!(a.allocate(10, 10), Some((12, 1)));
        assert_eq!(a.allocate(10, 10), Some((23, 1)));
    }

    #[test]
    fn wraps_to_next_shelf_below_tallest_region() {
        let mut a = AtlasAllocator::new(32, 1);
        assert_eq!(a.allocate(20, 8), Some((1, 1)));
        // 20 + 1 + 20 + 1 > 32, so this starts a new row below height 8.
        assert_eq!(a.allocate(20, 4), Some((1, 10)));
    }

    #[test]
    fn oversized_region_marks_full() {
        let mut a = AtlasAllocator::new(16, 1);
        assert_eq!(a.allocate(32, 4), None);
        assert!(a.is_full());
        // Subsequent small requests are refused too.
        assert_eq!(a.allocate(2, 2), None);
    }

    #[test]
    fn vertical_exhaustion_marks_full() {
        let mut a = AtlasAllocator::new(16, 1);
        assert!(a.allocate(14, 6).is_some());
        assert!(a.allocate(14, 6).is_some());
        // Third row would exceed the atlas height.
        assert_eq!(a.allocate(14, 6), None);
        assert!(a.is_full());
    }

    #[test]
    fn zero_sized_region_is_refused_without_filling() {
        let mut a = AtlasAllocator::new(16, 1);
        assert_eq!(a.allocate(0, 4), None);
        assert!(!a.is_full());
        assert!(a.allocate(4, 4).is_some());
    }
}
