use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    // top-left corner
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Into<imageproc::rect::Rect> for Rect {
    // requires w > 0 and h > 0
    fn into(self) -> imageproc::rect::Rect {
        imageproc::rect::Rect::at(self.x, self.y).of_size(self.w, self.h)
    }
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    /// Intersect with a `width` x `height` image. A rect fully outside the
    /// image collapses to zero width or height.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.clamp(0, width as i32);
        let y = self.y.clamp(0, height as i32);
        let w = (self.right().min(width as i32) - x).max(0) as u32;
        let h = (self.bottom().min(height as i32) - y).max(0) as u32;

        Rect { x, y, w, h }
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= width as i32 && self.bottom() <= height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_identity() {
        let r = Rect::new(10, 20, 30, 40);
        assert_eq!(r.clamp_to(100, 100), r);
    }

    #[test]
    fn test_clamp_negative_origin() {
        let r = Rect::new(-5, -8, 30, 40);
        let clamped = r.clamp_to(100, 100);
        assert_eq!(clamped, Rect::new(0, 0, 25, 32));
        assert!(clamped.fits_within(100, 100));
    }

    #[test]
    fn test_clamp_overhanging_edges() {
        let r = Rect::new(90, 95, 30, 40);
        let clamped = r.clamp_to(100, 100);
        assert_eq!(clamped, Rect::new(90, 95, 10, 5));
        assert!(clamped.fits_within(100, 100));
    }

    #[test]
    fn test_clamp_fully_outside_collapses() {
        let r = Rect::new(200, 200, 10, 10);
        let clamped = r.clamp_to(100, 100);
        assert_eq!(clamped.area(), 0);
    }

    #[test]
    fn test_serializes_with_short_keys() {
        let r = Rect::new(1, 2, 3, 4);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({"x": 1, "y": 2, "w": 3, "h": 4}));
    }
}
