use crate::door::DoorState;
use crate::layout::*;
use crate::location::WorldPos;
use crate::oracle::Obb;

pub trait LayoutVisualizer {
    fn room(&mut self, room: &LayoutRoom, footprint: &Obb);
    fn door(&mut self, door: &LayoutDoor);
}

/// Feed every room footprint, then every door, of `layout` to `visualizer`.
pub fn render_layout(layout: &Layout, visualizer: &mut dyn LayoutVisualizer) {
    for room in &layout.rooms {
        for footprint in &room.footprint {
            visualizer.room(room, footprint);
        }
    }
    for door in layout.rooms.iter().flat_map(|r| r.doors.iter()) {
        visualizer.door(door);
    }
}

/// Rasterises a layout to text, one character per `cell` world units.
///
/// Rooms draw as the last digit of their depth; doors as `o` (open),
/// `+` (connected) or `x` (walled). North is up.
pub struct AsciiVisualizer {
    cell: f32,
    footprints: Vec<(Obb, char)>,
    doors: Vec<(WorldPos, char)>,
}

impl AsciiVisualizer {
    pub fn new(cell: f32) -> Self {
        AsciiVisualizer {
            cell: cell.max(0.01),
            footprints: Vec::new(),
            doors: Vec::new(),
        }
    }

    fn bounds(&self) -> Option<(WorldPos, WorldPos)> {
        let points = self
            .footprints
            .iter()
            .flat_map(|(obb, _)| obb.corners())
            .chain(self.doors.iter().map(|(p, _)| *p));

        points.fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((
                WorldPos::new(lo.x.min(p.x), lo.z.min(p.z)),
                WorldPos::new(hi.x.max(p.x), hi.z.max(p.z)),
            )),
        })
    }

    pub fn render(&self) -> String {
        let (lo, hi) = match self.bounds() {
            Some(bounds) => bounds,
            None => return String::new(),
        };
        let columns = ((hi.x - lo.x) / self.cell).floor() as usize + 1;
        let rows = ((hi.z - lo.z) / self.cell).floor() as usize + 1;
        let mut grid = vec![vec![' '; columns]; rows];

        let cell_of = |p: WorldPos| {
            let column = (((p.x - lo.x) / self.cell).floor() as usize).min(columns - 1);
            let row = (((hi.z - p.z) / self.cell).floor() as usize).min(rows - 1);
            (row, column)
        };

        for (row, line) in grid.iter_mut().enumerate() {
            for (column, c) in line.iter_mut().enumerate() {
                let center = WorldPos::new(
                    lo.x + (column as f32 + 0.5) * self.cell,
                    hi.z - (row as f32 + 0.5) * self.cell,
                );
                if let Some((_, mark)) = self.footprints.iter().find(|(obb, _)| obb.contains(center)) {
                    *c = *mark;
                }
            }
        }
        for (position, mark) in &self.doors {
            let (row, column) = cell_of(*position);
            grid[row][column] = *mark;
        }

        grid.into_iter()
            .map(|line| line.into_iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl LayoutVisualizer for AsciiVisualizer {
    fn room(&mut self, room: &LayoutRoom, footprint: &Obb) {
        let mark = std::char::from_digit(room.depth % 10, 10).unwrap_or('#');
        self.footprints.push((*footprint, mark));
    }

    fn door(&mut self, door: &LayoutDoor) {
        let mark = match door.state {
            DoorState::Open => 'o',
            DoorState::Connected(_) => '+',
            DoorState::Walled => 'x',
        };
        self.doors.push((door.position, mark));
    }
}
