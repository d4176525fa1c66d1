//! Topology file input.
//!
//! Every reader turns a file into [`MeshArrays`] and hands them to
//! [`build_blueprint`], so files are validated exactly like in-memory input.
//!
//! [`MeshArrays`]: crate::mesh::MeshArrays
//! [`build_blueprint`]: crate::mesh::build_blueprint
//!
//! # Supported Formats
//!
//! | Format | Extension | Notes |
//! |--------|-----------|-------|
//! | FreeDTS topology | `.tsi` | Box, vertices, triangles, inclusions |
//! | FreeDTS topology | `.q` | Box, vertices, triangles |
//! | PLY | `.ply` | Stanford polygon format, fan-triangulated |
//!
//! # Usage
//!
//! ```no_run
//! use dtsmesh::io::load_blueprint;
//!
//! let blueprint = load_blueprint("vesicle.tsi").unwrap();
//! println!("{} vertices", blueprint.vertices().len());
//! ```

pub mod ply;
pub mod q;
pub mod tsi;

use std::path::Path;
use std::str::FromStr;

use nalgebra::DMatrix;

use crate::error::{MeshError, Result};
use crate::mesh::{Blueprint, MeshArrays};

pub(crate) type ParseResult<T> = std::result::Result<T, SyntaxError>;

/// Supported topology file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// FreeDTS `.tsi` format.
    Tsi,
    /// FreeDTS `.q` format.
    Q,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "tsi" => Some(Format::Tsi),
            "q" => Some(Format::Q),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

/// Load a blueprint from a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn load_blueprint<P: AsRef<Path>>(path: P) -> Result<Blueprint> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })?;

    let blueprint = match format {
        Format::Tsi => tsi::load(path)?,
        Format::Q => q::load(path)?,
        Format::Ply => ply::load(path)?,
    };
    log::debug!(
        "loaded {}: {} vertices, {} triangles, {} inclusions",
        path.display(),
        blueprint.vertices().len(),
        blueprint.triangles().len(),
        blueprint.inclusions().len()
    );
    Ok(blueprint)
}

/// A malformed line in a text topology file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    /// Attach the file path.
    pub(crate) fn at(self, path: &Path) -> MeshError {
        MeshError::LoadError {
            path: path.to_path_buf(),
            message: format!("line {}: {}", self.line, self.message),
        }
    }
}

/// Non-blank lines of a text file, split into tokens, with 1-based line numbers.
pub(crate) struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
            last: 0,
        }
    }

    /// The next non-blank line.
    pub(crate) fn next_line(&mut self) -> Option<(usize, Vec<&'a str>)> {
        for (i, line) in self.inner.by_ref() {
            self.last = i + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !tokens.is_empty() {
                return Some((i + 1, tokens));
            }
        }
        None
    }

    /// The next non-blank line, or an error naming what was expected.
    pub(crate) fn expect_line(&mut self, what: &str) -> ParseResult<(usize, Vec<&'a str>)> {
        self.next_line()
            .ok_or_else(|| SyntaxError::new(self.last + 1, format!("unexpected end of file, expected {}", what)))
    }
}

/// Parse one token.
pub(crate) fn parse_token<T: FromStr>(
    tokens: &[&str],
    index: usize,
    line: usize,
    what: &str,
) -> ParseResult<T> {
    let token = tokens
        .get(index)
        .ok_or_else(|| SyntaxError::new(line, format!("missing {}", what)))?;
    token
        .parse()
        .map_err(|_| SyntaxError::new(line, format!("invalid {} '{}'", what, token)))
}

/// Parse a record id and require it to equal its position.
pub(crate) fn parse_sequential_id(
    tokens: &[&str],
    line: usize,
    entity: &str,
    position: usize,
) -> ParseResult<()> {
    let id: i64 = parse_token(tokens, 0, line, &format!("{} id", entity))?;
    if id != position as i64 {
        return Err(SyntaxError::new(
            line,
            format!("{} id {} at position {}; ids must be sequential from 0", entity, id, position),
        ));
    }
    Ok(())
}

/// Records shared by the FreeDTS formats.
#[derive(Debug, Default)]
pub(crate) struct TextTables {
    pub simbox: Option<[f64; 3]>,
    pub vertices: Vec<[f64; 3]>,
    pub domains: Vec<i64>,
    pub triangles: Vec<[i64; 3]>,
    pub inclusions: Vec<[i64; 2]>,
    pub directions: Vec<[f64; 2]>,
}

impl TextTables {
    /// `box Lx Ly Lz` or a bare `Lx Ly Lz` line, starting at `offset`.
    pub(crate) fn read_box(&mut self, tokens: &[&str], offset: usize, line: usize) -> ParseResult<()> {
        let mut extents = [0.0; 3];
        for (k, extent) in extents.iter_mut().enumerate() {
            *extent = parse_token(tokens, offset + k, line, "box extent")?;
        }
        self.simbox = Some(extents);
        Ok(())
    }

    /// `count` records of `id x y z [domain]`.
    pub(crate) fn read_vertices(&mut self, lines: &mut Lines<'_>, count: usize) -> ParseResult<()> {
        for position in 0..count {
            let (line, tokens) = lines.expect_line("a vertex record")?;
            parse_sequential_id(&tokens, line, "vertex", position)?;
            let x = parse_token(&tokens, 1, line, "x coordinate")?;
            let y = parse_token(&tokens, 2, line, "y coordinate")?;
            let z = parse_token(&tokens, 3, line, "z coordinate")?;
            let domain = if tokens.len() > 4 {
                parse_token(&tokens, 4, line, "domain id")?
            } else {
                0
            };
            self.vertices.push([x, y, z]);
            self.domains.push(domain);
        }
        Ok(())
    }

    /// `count` records of `id v1 v2 v3 [...]`.
    pub(crate) fn read_triangles(&mut self, lines: &mut Lines<'_>, count: usize) -> ParseResult<()> {
        for position in 0..count {
            let (line, tokens) = lines.expect_line("a triangle record")?;
            parse_sequential_id(&tokens, line, "triangle", position)?;
            let mut corners = [0i64; 3];
            for (k, corner) in corners.iter_mut().enumerate() {
                *corner = parse_token(&tokens, k + 1, line, "triangle vertex")?;
            }
            self.triangles.push(corners);
        }
        Ok(())
    }

    /// `count` records of `id type_id vertex_id dx dy`.
    pub(crate) fn read_inclusions(&mut self, lines: &mut Lines<'_>, count: usize) -> ParseResult<()> {
        for position in 0..count {
            let (line, tokens) = lines.expect_line("an inclusion record")?;
            parse_sequential_id(&tokens, line, "inclusion", position)?;
            let type_id = parse_token(&tokens, 1, line, "inclusion type id")?;
            let vertex = parse_token(&tokens, 2, line, "inclusion vertex id")?;
            let dx = parse_token(&tokens, 3, line, "inclusion direction")?;
            let dy = parse_token(&tokens, 4, line, "inclusion direction")?;
            self.inclusions.push([type_id, vertex]);
            self.directions.push([dx, dy]);
        }
        Ok(())
    }

    /// Convert to validator input.
    pub(crate) fn into_arrays(self) -> MeshArrays {
        let mut arrays = MeshArrays::from_rows(&self.vertices, &self.triangles)
            .with_vertex_domains(self.domains);
        if let Some(extents) = self.simbox {
            arrays = arrays.with_box_size(extents.to_vec());
        }
        if !self.inclusions.is_empty() {
            let k = self.inclusions.len();
            let inclusions: Vec<i64> = self.inclusions.iter().flatten().copied().collect();
            let directions: Vec<f64> = self.directions.iter().flatten().copied().collect();
            arrays = arrays.with_inclusions(
                DMatrix::from_row_slice(k, 2, &inclusions),
                DMatrix::from_row_slice(k, 2, &directions),
            );
        }
        arrays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/mesh.tsi"), Some(Format::Tsi));
        assert_eq!(Format::from_path("mesh.Q"), Some(Format::Q));
        assert_eq!(Format::from_path("mesh.ply"), Some(Format::Ply));
        assert_eq!(Format::from_path("mesh.obj"), None);
        assert_eq!(Format::from_path("mesh"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_blueprint("mesh.obj").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(matches!(err, MeshError::UnsupportedFormat { extension } if extension == "obj"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_blueprint(dir.path().join("missing.tsi")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_lines_skip_blanks() {
        let mut lines = Lines::new("\n  a b\n\n c\n");
        assert_eq!(lines.next_line(), Some((2, vec!["a", "b"])));
        assert_eq!(lines.next_line(), Some((4, vec!["c"])));
        assert_eq!(lines.next_line(), None);
        let err = lines.expect_line("more").unwrap_err();
        assert!(err.message.contains("expected more"));
    }

    #[test]
    fn test_parse_token_errors() {
        let tokens = ["1", "x"];
        assert_eq!(parse_token::<i64>(&tokens, 0, 3, "id"), Ok(1));
        let err = parse_token::<f64>(&tokens, 1, 3, "coordinate").unwrap_err();
        assert_eq!(err, SyntaxError::new(3, "invalid coordinate 'x'"));
        let err = parse_token::<f64>(&tokens, 2, 3, "coordinate").unwrap_err();
        assert_eq!(err.message, "missing coordinate");
    }

    #[test]
    fn test_sequential_ids() {
        assert!(parse_sequential_id(&["2"], 7, "vertex", 2).is_ok());
        let err = parse_sequential_id(&["3"], 7, "vertex", 2).unwrap_err();
        assert_eq!(err.line, 7);
        assert!(err.message.contains("sequential"));
    }
}
