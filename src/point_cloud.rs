use anyhow::{bail, Result};
use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub enum PointSize {
    Uniform(f32),
    PerPoint(Vec<f32>),
}

impl PointSize {
    pub fn get(&self, index: usize) -> f32 {
        match self {
            PointSize::Uniform(size) => *size,
            PointSize::PerPoint(sizes) => sizes[index],
        }
    }
}

/// A fixed-size set of colored point sprites.
///
/// Every point has exactly one color and, for [`PointSize::PerPoint`], one
/// size. The count never changes after construction; only the contents of
/// `positions` and `colors` may be rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
    sizes: PointSize,
}

impl PointCloud {
    pub fn new(positions: Vec<Vec3>, colors: Vec<Vec3>, sizes: PointSize) -> Result<Self> {
        if colors.len() != positions.len() {
            bail!(
                "Point cloud has {} positions but {} colors",
                positions.len(),
                colors.len()
            );
        }
        if let PointSize::PerPoint(sizes) = &sizes {
            if sizes.len() != positions.len() {
                bail!(
                    "Point cloud has {} positions but {} sizes",
                    positions.len(),
                    sizes.len()
                );
            }
        }

        Ok(Self {
            positions,
            colors,
            sizes,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn sizes(&self) -> &PointSize {
        &self.sizes
    }

    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    pub fn colors_mut(&mut self) -> &mut [Vec3] {
        &mut self.colors
    }
}
