//! FreeDTS `.tsi` topology files.
//!
//! ```text
//! version 1.1
//! box   50.0  50.0  50.0
//! vertex  4
//! 0   0.0 0.0 0.0   0
//! 1   1.0 0.0 0.0   0
//! ...
//! triangle  2
//! 0   0 1 2   1
//! ...
//! inclusion  1
//! 0   2 1   1.0 0.0
//! ```
//!
//! Sections start with a keyword and a record count. Vertex records are
//! `id x y z [domain]`, triangle records `id v1 v2 v3 [...]` and inclusion
//! records `id type_id vertex_id dx dy`. `version` and `inclusion` are
//! optional.

use std::fs;
use std::path::Path;

use super::{parse_token, Lines, ParseResult, SyntaxError, TextTables};
use crate::error::Result;
use crate::mesh::{build_blueprint, Blueprint, MeshArrays};

/// Load a blueprint from a `.tsi` file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Blueprint> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let arrays = parse(&text).map_err(|e| e.at(path))?;
    build_blueprint(&arrays)
}

/// Parse `.tsi` text into raw tables.
pub(crate) fn parse(text: &str) -> ParseResult<MeshArrays> {
    let mut lines = Lines::new(text);
    let mut tables = TextTables::default();
    let mut seen_vertices = false;
    let mut seen_triangles = false;
    let mut seen_inclusions = false;

    while let Some((line, tokens)) = lines.next_line() {
        match tokens[0] {
            "version" => {}
            "box" => tables.read_box(&tokens, 1, line)?,
            "vertex" => {
                enter_section(&mut seen_vertices, "vertex", line)?;
                let count = parse_token(&tokens, 1, line, "vertex count")?;
                tables.read_vertices(&mut lines, count)?;
            }
            "triangle" => {
                enter_section(&mut seen_triangles, "triangle", line)?;
                let count = parse_token(&tokens, 1, line, "triangle count")?;
                tables.read_triangles(&mut lines, count)?;
            }
            "inclusion" => {
                enter_section(&mut seen_inclusions, "inclusion", line)?;
                let count = parse_token(&tokens, 1, line, "inclusion count")?;
                tables.read_inclusions(&mut lines, count)?;
            }
            other => {
                return Err(SyntaxError::new(line, format!("unexpected keyword '{}'", other)));
            }
        }
    }

    if !seen_vertices {
        return Err(SyntaxError::new(0, "missing vertex section"));
    }
    if !seen_triangles {
        return Err(SyntaxError::new(0, "missing triangle section"));
    }
    Ok(tables.into_arrays())
}

/// Each section may appear once; ids restart at zero within a section.
fn enter_section(seen: &mut bool, name: &str, line: usize) -> ParseResult<()> {
    if std::mem::replace(seen, true) {
        return Err(SyntaxError::new(line, format!("duplicate {} section", name)));
    }
    Ok(())
}
