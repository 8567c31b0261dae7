use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// A grid map of passable/blocked cells, addressed by flat row-major index.
///
/// Movement is four-connected plus "wait" (stay at the same cell). Cells are
/// identified only by index; row/col coordinates are recovered on demand for
/// output purposes (path dumps), never used internally.
#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    passable: Vec<bool>,
    neighbors: Vec<Vec<usize>>,
    name: String,
}

impl Map {
    pub fn from_file(path: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let _type = lines.next().ok_or_else(eof)??;
        let height = parse_last_usize(&lines.next().ok_or_else(eof)??);
        let width = parse_last_usize(&lines.next().ok_or_else(eof)??);
        let _map = lines.next().ok_or_else(eof)??;

        let mut passable = Vec::with_capacity(height * width);
        for line in lines.take(height) {
            let line = line?;
            for ch in line.chars() {
                passable.push(ch == '.');
            }
        }

        let name = std::path::Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        let mut map = Map {
            height,
            width,
            passable,
            neighbors: Vec::new(),
            name,
        };
        map.initialize_neighbors();
        Ok(map)
    }

    /// Builds a map from an in-memory grid of passability, row-major. Used by
    /// tests that don't want to touch the filesystem.
    pub fn from_grid(height: usize, width: usize, passable: Vec<bool>) -> Self {
        assert_eq!(passable.len(), height * width);
        let mut map = Map {
            height,
            width,
            passable,
            neighbors: Vec::new(),
            name: "inline".to_string(),
        };
        map.initialize_neighbors();
        map
    }

    fn initialize_neighbors(&mut self) {
        self.neighbors = (0..self.height * self.width)
            .map(|cell| self.compute_neighbors(cell))
            .collect();
    }

    fn compute_neighbors(&self, cell: usize) -> Vec<usize> {
        if !self.passable[cell] {
            return Vec::new();
        }
        let (row, col) = self.row_col(cell);
        let mut out = Vec::with_capacity(4);
        let deltas: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        for (dr, dc) in deltas {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr >= 0 && nc >= 0 && (nr as usize) < self.height && (nc as usize) < self.width {
                let n = self.index(nr as usize, nc as usize);
                if self.passable[n] {
                    out.push(n);
                }
            }
        }
        out
    }

    pub fn map_size(&self) -> usize {
        self.height * self.width
    }

    pub fn num_of_cols(&self) -> usize {
        self.width
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn row_col(&self, cell: usize) -> (usize, usize) {
        (cell / self.width, cell % self.width)
    }

    pub fn is_passable(&self, cell: usize) -> bool {
        self.passable[cell]
    }

    /// Movement neighbors of `cell` (four-connected, passable only). Does
    /// NOT include `cell` itself — callers that also allow "wait" append it
    /// themselves, matching spec.md's "four-connected plus wait".
    pub fn get_neighbors(&self, cell: usize) -> &[usize] {
        &self.neighbors[cell]
    }

    /// True iff moving from `from` to `to` in one timestep is legal: either
    /// a wait (`from == to`) or a listed movement neighbor.
    pub fn valid_move(&self, from: usize, to: usize) -> bool {
        from == to || self.neighbors[from].contains(&to)
    }

    pub fn get_instance_name(&self) -> &str {
        &self.name
    }

    /// Single-source shortest path distances (in hops) from every cell to
    /// `goal`, used as the per-agent heuristic table. Unreachable cells are
    /// `usize::MAX`.
    pub fn heuristic_from_goal(&self, goal: usize) -> Vec<usize> {
        let mut dist = vec![usize::MAX; self.map_size()];
        let mut heap = BinaryHeap::new();

        dist[goal] = 0;
        heap.push(Reverse((0, goal)));

        while let Some(Reverse((cost, cell))) = heap.pop() {
            if cost > dist[cell] {
                continue;
            }
            for &n in &self.neighbors[cell] {
                let next_cost = cost + 1;
                if next_cost < dist[n] {
                    dist[n] = next_cost;
                    heap.push(Reverse((next_cost, n)));
                }
            }
        }

        dist
    }
}

fn parse_last_usize(line: &str) -> usize {
    line.split_whitespace()
        .last()
        .expect("malformed map header line")
        .parse()
        .expect("non-numeric map header value")
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated map file")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_4x4() -> Map {
        // . . . .
        // . # # .
        // . # # .
        // . . . .
        let mut passable = vec![true; 16];
        for &c in &[5usize, 6, 9, 10] {
            passable[c] = false;
        }
        Map::from_grid(4, 4, passable)
    }

    #[test]
    fn neighbors_are_four_connected_and_passable_only() {
        let map = open_4x4();
        let n = map.get_neighbors(map.index(0, 0));
        assert_eq!(n.len(), 2);
        assert!(n.contains(&map.index(1, 0)));
        assert!(n.contains(&map.index(0, 1)));
    }

    #[test]
    fn wait_is_a_valid_move() {
        let map = open_4x4();
        let c = map.index(0, 0);
        assert!(map.valid_move(c, c));
    }

    #[test]
    fn blocked_cell_has_no_neighbors() {
        let map = open_4x4();
        assert!(map.get_neighbors(map.index(1, 1)).is_empty());
    }

    #[test]
    fn heuristic_matches_manhattan_on_open_map() {
        let passable = vec![true; 9];
        let map = Map::from_grid(3, 3, passable);
        let h = map.heuristic_from_goal(map.index(2, 2));
        assert_eq!(h[map.index(0, 0)], 4);
        assert_eq!(h[map.index(2, 2)], 0);
    }
}
