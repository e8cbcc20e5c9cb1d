//! Per-column wall distance cache shared by the ray caster and the sprite compositor.

/// One entry per screen column. `f32::INFINITY` means no wall was hit in that column.
#[derive(Clone, Debug)]
pub struct DepthBuffer {
    depths: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: u32) -> Self {
        Self {
            depths: vec![f32::INFINITY; width as usize],
        }
    }

    pub fn resize(&mut self, width: u32) {
        self.depths.resize(width as usize, f32::INFINITY);
    }

    /// Forgets every hit from the previous frame.
    pub fn reset(&mut self) {
        self.depths.fill(f32::INFINITY);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Columns outside the buffer report no occluder.
    #[inline]
    pub fn get(&self, column: i32) -> f32 {
        if column < 0 {
            return f32::INFINITY;
        }
        self.depths
            .get(column as usize)
            .copied()
            .unwrap_or(f32::INFINITY)
    }

    #[inline]
    pub fn set(&mut self, column: usize, distance: f32) {
        if let Some(d) = self.depths.get_mut(column) {
            *d = distance;
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.depths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_and_bounds() {
        let mut depth = DepthBuffer::new(3);
        depth.set(1, 2.5);
        depth.set(7, 1.0);
        assert_eq!(depth.get(1), 2.5);
        assert_eq!(depth.get(-1), f32::INFINITY);
        assert_eq!(depth.get(3), f32::INFINITY);
        depth.reset();
        assert!(depth.as_slice().iter().all(|d| d.is_infinite()));
        depth.resize(5);
        assert_eq!(depth.len(), 5);
    }
}
