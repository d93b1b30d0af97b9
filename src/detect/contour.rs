//! Border following (Suzuki & Abe, 1985) over binary masks.
//!
//! Every border is extracted: outer borders of foreground components and the
//! borders of holes inside them, in raster discovery order. The mask is padded
//! with one background pixel on each side so components touching the frame edge
//! still close.

use super::mask::Mask;

/// Neighbour offsets `(dy, dx)` in counter-clockwise order, starting east.
const NEIGHBORS: [(i32, i32); 8] = [
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Axis-aligned bounding rectangle, inclusive of every border pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<Point>,
    pub is_hole: bool,
}

impl Contour {
    /// Area enclosed by the border polygon (shoelace formula).
    ///
    /// Measured through pixel centres, so a solid w x h block has area (w-1)(h-1).
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut twice_area: i64 = 0;
        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    pub fn bounding_rect(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }
}

/// Extract all borders from `mask`.
pub fn find_contours(mask: &Mask) -> Vec<Contour> {
    let mut grid = LabelGrid::from_mask(mask);
    let mut contours = Vec::new();
    let mut nbd = 1;

    for i in 1..grid.height - 1 {
        for j in 1..grid.width - 1 {
            let value = grid.get((i, j));
            if value == 0 {
                continue;
            }
            let start = if value == 1 && grid.get((i, j - 1)) == 0 {
                Some(((i, j - 1), false))
            } else if value >= 1 && grid.get((i, j + 1)) == 0 {
                Some(((i, j + 1), true))
            } else {
                None
            };
            if let Some((from, is_hole)) = start {
                nbd += 1;
                let points = grid.follow_border((i, j), from, nbd);
                contours.push(Contour { points, is_hole });
            }
        }
    }

    contours
}

/// Padded label image. 0 is background, 1 unvisited foreground, +/-n border n.
struct LabelGrid {
    width: i32,
    height: i32,
    labels: Vec<i32>,
}

type Cell = (i32, i32);

impl LabelGrid {
    fn from_mask(mask: &Mask) -> Self {
        let width = mask.width() as i32 + 2;
        let height = mask.height() as i32 + 2;
        let mut labels = vec![0; width as usize * height as usize];
        for y in 0..mask.height() {
            for x in 0..mask.width() {
                if mask.get(x, y) {
                    labels[((y as i32 + 1) * width + x as i32 + 1) as usize] = 1;
                }
            }
        }
        Self {
            width,
            height,
            labels,
        }
    }

    fn get(&self, (i, j): Cell) -> i32 {
        self.labels[(i * self.width + j) as usize]
    }

    fn set(&mut self, (i, j): Cell, value: i32) {
        self.labels[(i * self.width + j) as usize] = value;
    }

    fn follow_border(&mut self, start: Cell, from: Cell, nbd: i32) -> Vec<Point> {
        // Clockwise search around the start pixel for the first foreground neighbour.
        let from_dir = direction(start, from);
        let first = (0..8)
            .map(|k| step(start, (from_dir + 8 - k) % 8))
            .find(|&cell| self.get(cell) != 0);
        let Some(first) = first else {
            self.set(start, -nbd);
            return vec![to_point(start)];
        };

        let mut points = Vec::new();
        let mut prev = first;
        let mut current = start;
        loop {
            points.push(to_point(current));

            // Counter-clockwise search starting just after the previous border pixel.
            let prev_dir = direction(current, prev);
            let mut east_is_background = false;
            let mut next = prev;
            for k in 1..=8 {
                let dir = (prev_dir + k) % 8;
                let cell = step(current, dir);
                if self.get(cell) != 0 {
                    next = cell;
                    break;
                }
                if dir == 0 {
                    east_is_background = true;
                }
            }

            if east_is_background {
                self.set(current, -nbd);
            } else if self.get(current) == 1 {
                self.set(current, nbd);
            }

            if next == start && current == first {
                break;
            }
            prev = current;
            current = next;
        }
        points
    }
}

fn step((i, j): Cell, dir: usize) -> Cell {
    let (dy, dx) = NEIGHBORS[dir];
    (i + dy, j + dx)
}

fn direction(from: Cell, to: Cell) -> usize {
    let delta = (to.0 - from.0, to.1 - from.1);
    NEIGHBORS
        .iter()
        .position(|&offset| offset == delta)
        .unwrap_or(0)
}

fn to_point((i, j): Cell) -> Point {
    Point { x: j - 1, y: i - 1 }
}
