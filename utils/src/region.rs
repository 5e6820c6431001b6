// Region tracking helpers
//
// DALi Adaptor Contributors

/// A rectangular region
///
/// This can be used to track input regions, damage boxes, etc. It is
/// determined by the corners of a rectangle:
///   r_pos:  the upper left corner's position in surface coordinates
///   r_size: the distance from the left to the lower right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T> {
    pub r_pos: (T, T),
    pub r_size: (T, T),
}

impl<T> Rect<T> {
    pub fn new(x: T, y: T, width: T, height: T) -> Rect<T> {
        Rect {
            r_pos: (x, y),
            r_size: (width, height),
        }
    }
}

/// A contiguous (x, y, w, h) damage rectangle in 32-bit surface
/// coordinates, the wire representation the render surface passes to
/// platform partial-update extensions.
pub type DamageRect = Rect<i32>;

impl Rect<i32> {
    /// Does this rectangle overlap with `other`?
    pub fn intersects(&self, other: &Rect<i32>) -> bool {
        let (ax, ay) = self.r_pos;
        let (aw, ah) = self.r_size;
        let (bx, by) = other.r_pos;
        let (bw, bh) = other.r_size;

        ax < bx + bw && bx < ax + aw && ay < by + bh && by < ay + ah
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_new() {
        let r = Rect::new(1, 2, 3, 4);
        assert_eq!(r.r_pos, (1, 2));
        assert_eq!(r.r_size, (3, 4));
    }

    #[test]
    fn rect_intersects() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        let c = Rect::new(20, 20, 5, 5);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
