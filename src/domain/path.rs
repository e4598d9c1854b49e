/// Moving-platform paths.
///
/// ## Text form
///   `100>105^110`: grid indices joined by direction glyphs. Each glyph
///   names the direction from the node before it to the node after it:
///   `>` right, `<` left, `^` up, `v` down.
///
/// The text is parsed once into a node list plus `{from, to, glyph}` edges;
/// the automaton only ever reads the edge list. `parse` checks syntax only.
/// `validate` checks the path against a concrete grid shape.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Glyph {
    Right,
    Left,
    Up,
    Down,
}

impl Glyph {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(Glyph::Right),
            '<' => Some(Glyph::Left),
            '^' => Some(Glyph::Up),
            'v' => Some(Glyph::Down),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Glyph::Right => '>',
            Glyph::Left => '<',
            Glyph::Up => '^',
            Glyph::Down => 'v',
        }
    }

    /// Unit step in world pixels, y DOWN.
    pub fn unit(self) -> (i32, i32) {
        match self {
            Glyph::Right => (1, 0),
            Glyph::Left => (-1, 0),
            Glyph::Up => (0, -1),
            Glyph::Down => (0, 1),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PathEdge {
    pub from: usize,
    pub to: usize,
    pub glyph: Glyph,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("unexpected {found:?} at position {at}")]
    Unexpected { found: char, at: usize },
    #[error("path ends with a direction glyph")]
    DanglingGlyph,
    #[error("node {0} is not a number")]
    BadNode(String),
    #[error("node {index} lies outside the {cells}-cell grid")]
    OutOfGrid { index: usize, cells: usize },
    #[error("edge {from}{}{to} does not follow its glyph", .glyph.as_char())]
    Misaligned { from: usize, to: usize, glyph: Glyph },
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct PlatformPath {
    nodes: Vec<usize>,
    edges: Vec<PathEdge>,
}

impl PlatformPath {
    /// A path that never moves.
    pub fn single(node: usize) -> Self {
        PlatformPath { nodes: vec![node], edges: Vec::new() }
    }

    pub fn parse(text: &str) -> Result<Self, PathError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PathError::Empty);
        }

        let mut nodes = Vec::new();
        let mut glyphs = Vec::new();
        let mut digits = String::new();

        for (at, c) in text.chars().enumerate() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let glyph = Glyph::from_char(c).ok_or(PathError::Unexpected { found: c, at })?;
            if digits.is_empty() {
                return Err(PathError::Unexpected { found: c, at });
            }
            nodes.push(parse_node(&digits)?);
            digits.clear();
            glyphs.push(glyph);
        }
        if digits.is_empty() {
            return Err(PathError::DanglingGlyph);
        }
        nodes.push(parse_node(&digits)?);

        let edges = glyphs
            .iter()
            .enumerate()
            .map(|(i, &glyph)| PathEdge { from: nodes[i], to: nodes[i + 1], glyph })
            .collect();
        Ok(PlatformPath { nodes, edges })
    }

    /// Inverse of `parse`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(first) = self.nodes.first() {
            out.push_str(&first.to_string());
        }
        for e in &self.edges {
            out.push(e.glyph.as_char());
            out.push_str(&e.to.to_string());
        }
        out
    }

    /// Check every node is inside a `width`-wide grid of `cells` cells and
    /// every edge runs along its glyph's row or column.
    pub fn validate(&self, width: usize, cells: usize) -> Result<(), PathError> {
        if let Some(&index) = self.nodes.iter().find(|&&n| n >= cells) {
            return Err(PathError::OutOfGrid { index, cells });
        }
        if width == 0 {
            return Err(PathError::OutOfGrid { index: self.nodes.first().copied().unwrap_or(0), cells });
        }
        for e in &self.edges {
            let (fc, fr) = (e.from % width, e.from / width);
            let (tc, tr) = (e.to % width, e.to / width);
            let aligned = match e.glyph {
                Glyph::Right => fr == tr && tc > fc,
                Glyph::Left => fr == tr && tc < fc,
                Glyph::Down => fc == tc && tr > fr,
                Glyph::Up => fc == tc && tr < fr,
            };
            if !aligned {
                return Err(PathError::Misaligned { from: e.from, to: e.to, glyph: e.glyph });
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PathEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn last(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

fn parse_node(digits: &str) -> Result<usize, PathError> {
    digits.parse().map_err(|_| PathError::BadNode(digits.to_string()))
}

impl FromStr for PlatformPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformPath::parse(s)
    }
}

impl fmt::Display for PlatformPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_to_edge_list_and_back() {
        let p = PlatformPath::parse("100>105^110").unwrap();
        assert_eq!(p.nodes(), &[100, 105, 110]);
        assert_eq!(
            p.edges(),
            &[
                PathEdge { from: 100, to: 105, glyph: Glyph::Right },
                PathEdge { from: 105, to: 110, glyph: Glyph::Up },
            ]
        );
        assert_eq!(p.encode(), "100>105^110");
    }

    #[test]
    fn single_node_path() {
        let p = PlatformPath::parse("42").unwrap();
        assert_eq!(p.nodes(), &[42]);
        assert!(p.edges().is_empty());
        assert_eq!(p.to_string(), "42");
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(PlatformPath::parse(""), Err(PathError::Empty));
        assert_eq!(PlatformPath::parse("3>"), Err(PathError::DanglingGlyph));
        assert_eq!(PlatformPath::parse(">3"), Err(PathError::Unexpected { found: '>', at: 0 }));
        assert_eq!(PlatformPath::parse("3>>4"), Err(PathError::Unexpected { found: '>', at: 2 }));
        assert_eq!(PlatformPath::parse("3x4"), Err(PathError::Unexpected { found: 'x', at: 1 }));
    }

    #[test]
    fn validate_checks_grid_geometry() {
        // 10 wide, 5 tall.
        let ok = PlatformPath::parse("11>15v45<41^1").unwrap();
        assert_eq!(ok.validate(10, 50), Ok(()));

        let wrong_row = PlatformPath::parse("8>12").unwrap();
        assert!(matches!(wrong_row.validate(10, 50), Err(PathError::Misaligned { .. })));

        let backwards = PlatformPath::parse("15>11").unwrap();
        assert!(matches!(backwards.validate(10, 50), Err(PathError::Misaligned { .. })));

        let outside = PlatformPath::parse("11>60").unwrap();
        assert_eq!(outside.validate(10, 50), Err(PathError::OutOfGrid { index: 60, cells: 50 }));
    }

    #[test]
    fn glyph_units_follow_screen_axes() {
        assert_eq!(Glyph::Up.unit(), (0, -1));
        assert_eq!(Glyph::Down.unit(), (0, 1));
        assert_eq!(Glyph::from_char('v'), Some(Glyph::Down));
    }
}
