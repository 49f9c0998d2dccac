use eframe::egui::{Vec2, vec2};

const QUADTREE_LEAF_CAPACITY: usize = 12;
const QUADTREE_MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadBounds {
    pub(crate) center: Vec2,
    pub(crate) half_extent: f32,
}

impl QuadBounds {
    /// Square bounds covering every point, with a unit margin.
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let (min, max) = points.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), point| (min.min(*point), max.max(*point)),
        );
        if !(min.is_finite() && max.is_finite()) {
            return None;
        }

        let span = (max - min).max(Vec2::splat(1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span.max_elem() * 0.5 + 1.0,
        })
    }

    pub(crate) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    /// Quadrants are numbered `x_bit | y_bit << 1` with the bit set on the
    /// right/lower side.
    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = |bit: usize| if quadrant & bit == 0 { -1.0 } else { 1.0 };
        Self {
            center: self.center + vec2(sign(1) * quarter, sign(2) * quarter),
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    pub(crate) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two boxes; zero when they touch or overlap.
    pub(crate) fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - Vec2::splat(reach)).max(Vec2::ZERO);
        gap.length_sq()
    }

    fn distance_sq_to_point(self, point: Vec2) -> f32 {
        let gap = ((self.center - point).abs() - Vec2::splat(self.half_extent)).max(Vec2::ZERO);
        gap.length_sq()
    }
}

pub(crate) struct QuadNode {
    pub(crate) bounds: QuadBounds,
    pub(crate) center_of_mass: Vec2,
    pub(crate) mass: f32,
    pub(crate) indices: Vec<usize>,
    pub(crate) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    /// Sums mass and sorts points into quadrants in one pass. A node that may
    /// not split, or whose points all land in one quadrant, stays a leaf.
    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        depth: usize,
    ) -> Self {
        let split = depth < QUADTREE_MAX_DEPTH && indices.len() > QUADTREE_LEAF_CAPACITY;
        let mut weighted = Vec2::ZERO;
        let mut buckets: [Vec<usize>; 4] = Default::default();
        for &index in &indices {
            let position = positions[index];
            weighted += position;
            if split {
                buckets[bounds.quadrant_for(position)].push(index);
            }
        }

        let mass = indices.len() as f32;
        let center_of_mass = if indices.is_empty() {
            Vec2::ZERO
        } else {
            weighted / mass
        };

        let occupied = buckets.iter().filter(|bucket| !bucket.is_empty()).count();
        if occupied < 2 {
            return Self {
                bounds,
                center_of_mass,
                mass,
                indices,
                children: Default::default(),
            };
        }

        let children = std::array::from_fn(|quadrant| {
            let bucket = std::mem::take(&mut buckets[quadrant]);
            (!bucket.is_empty()).then(|| {
                Box::new(Self::build_node(
                    bounds.child(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                ))
            })
        });
        Self {
            bounds,
            center_of_mass,
            mass,
            indices: Vec::new(),
            children,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    fn collect_within(
        &self,
        point: Vec2,
        range: f32,
        positions: &[Vec2],
        found: &mut Vec<usize>,
    ) {
        if self.bounds.distance_sq_to_point(point) > range * range {
            return;
        }

        if self.is_leaf() {
            found.extend(
                self.indices
                    .iter()
                    .copied()
                    .filter(|&index| (positions[index] - point).length_sq() <= range * range),
            );
            return;
        }

        for child in self.children.iter().flatten() {
            child.collect_within(point, range, positions, found);
        }
    }
}

/// Spatial index over node positions, rebuilt wholesale from a position slice.
#[derive(Default)]
pub struct QuadTree {
    root: Option<QuadNode>,
    positions: Vec<Vec2>,
}

impl QuadTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(&mut self, positions: &[Vec2]) {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.root = QuadNode::build(&self.positions);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.root = None;
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Indices of every point within `range` of `point`, ascending.
    pub fn query_within(&self, point: Vec2, range: f32) -> Vec<usize> {
        let mut found = Vec::new();
        if let Some(root) = &self.root {
            root.collect_within(point, range.max(0.0), &self.positions, &mut found);
        }
        found.sort_unstable();
        found
    }

    pub(crate) fn root(&self) -> Option<&QuadNode> {
        self.root.as_ref()
    }

    pub(crate) fn positions(&self) -> &[Vec2] {
        &self.positions
    }
}
