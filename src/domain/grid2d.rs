use crate::error::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions2D(pub usize, pub usize); // nx, ny (lattice nodes)

impl GridDimensions2D {
    pub fn validate(&self) -> Result<(), GridError> {
        let GridDimensions2D(nx, ny) = *self;
        if nx < 1 || ny < 1 {
            return Err(GridError::InvalidGridSize(format!(
                "lattice must have at least 1x1 nodes, got {nx}x{ny}"
            )));
        }
        Ok(())
    }
}

/// Inclusive rectangle of lattice nodes, `x0..=x1` by `y0..=y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region2D {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl Region2D {
    pub fn new(x0: usize, x1: usize, y0: usize, y1: usize) -> Self {
        Self { x0, x1, y0, y1 }
    }

    pub fn whole(dimensions: GridDimensions2D) -> Self {
        let GridDimensions2D(nx, ny) = dimensions;
        Self::new(0, nx.saturating_sub(1), 0, ny.saturating_sub(1))
    }

    pub fn row(y: usize, x0: usize, x1: usize) -> Self {
        Self::new(x0, x1, y, y)
    }

    pub fn column(x: usize, y0: usize, y1: usize) -> Self {
        Self::new(x, x, y0, y1)
    }

    pub fn width(&self) -> usize {
        if self.x1 < self.x0 {
            0
        } else {
            self.x1 - self.x0 + 1
        }
    }

    pub fn height(&self) -> usize {
        if self.y1 < self.y0 {
            0
        } else {
            self.y1 - self.y0 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersection with the lattice, or `None` if nothing is left.
    pub fn clip(&self, dimensions: GridDimensions2D) -> Option<Self> {
        let GridDimensions2D(nx, ny) = dimensions;
        if nx == 0 || ny == 0 || self.is_empty() || self.x0 >= nx || self.y0 >= ny {
            return None;
        }
        Some(Self::new(
            self.x0,
            self.x1.min(nx - 1),
            self.y0,
            self.y1.min(ny - 1),
        ))
    }

    /// Node coordinates, x fastest.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.y0..=self.y1).flat_map(move |y| (self.x0..=self.x1).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_validation() {
        assert!(GridDimensions2D(5, 5).validate().is_ok());
        assert!(GridDimensions2D(1, 1).validate().is_ok());
        assert!(GridDimensions2D(0, 5).validate().is_err());
        assert!(GridDimensions2D(5, 0).validate().is_err());
    }

    #[test]
    fn test_whole_region() {
        let region = Region2D::whole(GridDimensions2D(5, 3));
        assert_eq!(region, Region2D::new(0, 4, 0, 2));
        assert_eq!(region.width(), 5);
        assert_eq!(region.height(), 3);
        assert_eq!(region.cells().count(), 15);
    }

    #[test]
    fn test_clip() {
        let dims = GridDimensions2D(5, 5);
        assert_eq!(
            Region2D::column(0, 0, 10).clip(dims),
            Some(Region2D::column(0, 0, 4))
        );
        assert_eq!(Region2D::row(7, 0, 4).clip(dims), None);
        assert_eq!(Region2D::new(3, 1, 0, 0).clip(dims), None);
    }

    #[test]
    fn test_cells_order() {
        let cells: Vec<_> = Region2D::new(1, 2, 3, 4).cells().collect();
        assert_eq!(cells, vec![(1, 3), (2, 3), (1, 4), (2, 4)]);
    }
}
