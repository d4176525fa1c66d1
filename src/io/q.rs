//! FreeDTS `.q` topology files.
//!
//! ```text
//! 50.0 50.0 50.0
//! 4
//! 0   0.0 0.0 0.0   0
//! ...
//! 2
//! 0   0 1 2   1
//! ...
//! ```
//!
//! The box line comes first, then the vertex count and `id x y z [domain]`
//! records, then the triangle count and `id v1 v2 v3 [...]` records.

use std::fs;
use std::path::Path;

use super::{parse_token, Lines, ParseResult, TextTables};
use crate::error::Result;
use crate::mesh::{build_blueprint, Blueprint, MeshArrays};

/// Load a blueprint from a `.q` file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Blueprint> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let arrays = parse(&text).map_err(|e| e.at(path))?;
    build_blueprint(&arrays)
}

/// Parse `.q` text into raw tables.
pub(crate) fn parse(text: &str) -> ParseResult<MeshArrays> {
    let mut lines = Lines::new(text);
    let mut tables = TextTables::default();

    let (line, tokens) = lines.expect_line("the box line")?;
    tables.read_box(&tokens, 0, line)?;

    let (line, tokens) = lines.expect_line("the vertex count")?;
    let count = parse_token(&tokens, 0, line, "vertex count")?;
    tables.read_vertices(&mut lines, count)?;

    let (line, tokens) = lines.expect_line("the triangle count")?;
    let count = parse_token(&tokens, 0, line, "triangle count")?;
    tables.read_triangles(&mut lines, count)?;

    Ok(tables.into_arrays())
}
