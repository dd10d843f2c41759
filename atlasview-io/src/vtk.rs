//! Legacy VTK `POLYDATA` support (ASCII only)
//!
//! Reads the `POINTS`, `POLYGONS` and `TRIANGLE_STRIPS` sections, plus point
//! `NORMALS` when present. Both the classic cell layout (`n i0 i1 ...`) and the
//! 5.1 `OFFSETS`/`CONNECTIVITY` layout are accepted. `VERTICES` and `LINES`
//! are skipped since they carry no surface.

use crate::error::IoError;
use crate::MeshReader;
use atlasview_core::{Point3f, Result, TriangleMesh, Vector3f};
use std::path::Path;

pub struct VtkReader;

impl MeshReader for VtkReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let content = std::fs::read_to_string(path)?;
        Ok(parse_polydata(&content)?)
    }
}

/// Parse the text of an ASCII legacy VTK polydata file
pub fn parse_polydata(content: &str) -> std::result::Result<TriangleMesh, IoError> {
    let mut lines = content.lines();

    let magic = lines.next().unwrap_or_default();
    if !magic.trim_start().starts_with("# vtk DataFile") {
        return Err(IoError::InvalidFormat {
            format: "missing '# vtk DataFile' header".to_string(),
        });
    }
    let _title = lines.next();
    let encoding = lines.next().unwrap_or_default().trim();
    if !encoding.eq_ignore_ascii_case("ASCII") {
        return Err(IoError::InvalidFormat {
            format: format!("unsupported VTK encoding '{}'", encoding),
        });
    }

    let mut tokens = Tokens::new(content, 3);
    tokens.expect("DATASET")?;
    let dataset = tokens.word()?;
    if !dataset.eq_ignore_ascii_case("POLYDATA") {
        return Err(IoError::InvalidFormat {
            format: format!("unsupported VTK dataset '{}'", dataset),
        });
    }

    let mut vertices: Vec<Point3f> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut normals: Option<Vec<Vector3f>> = None;

    while let Some(keyword) = tokens.next_word() {
        match keyword.to_ascii_uppercase().as_str() {
            "POINTS" => {
                let n = tokens.usize()?;
                let _type = tokens.word()?;
                vertices = tokens.points(n)?;
            }
            "POLYGONS" => {
                for cell in tokens.cells()? {
                    for k in 1..cell.len().saturating_sub(1) {
                        faces.push([cell[0], cell[k], cell[k + 1]]);
                    }
                }
            }
            "TRIANGLE_STRIPS" => {
                for strip in tokens.cells()? {
                    for k in 0..strip.len().saturating_sub(2) {
                        // every other triangle is flipped to keep a consistent winding
                        if k % 2 == 0 {
                            faces.push([strip[k], strip[k + 1], strip[k + 2]]);
                        } else {
                            faces.push([strip[k + 1], strip[k], strip[k + 2]]);
                        }
                    }
                }
            }
            "VERTICES" | "LINES" => {
                tokens.cells()?;
            }
            "POINT_DATA" => {
                let n = tokens.usize()?;
                if tokens.peek_word().map(|w| w.eq_ignore_ascii_case("NORMALS")) == Some(true) {
                    tokens.word()?;
                    let _name = tokens.word()?;
                    let _type = tokens.word()?;
                    let points = tokens.points(n)?;
                    normals = Some(points.into_iter().map(|p| p.coords).collect());
                }
                break;
            }
            "CELL_DATA" | "FIELD" | "METADATA" => break,
            other => {
                return Err(IoError::parse(
                    tokens.line(),
                    format!("unexpected keyword '{}'", other),
                ))
            }
        }
    }

    if let Some(bad) = faces.iter().flatten().find(|&&i| i >= vertices.len()) {
        return Err(IoError::parse(
            tokens.line(),
            format!("cell index {} out of range for {} points", bad, vertices.len()),
        ));
    }

    log::debug!(
        "Parsed VTK polydata with {} points and {} triangles",
        vertices.len(),
        faces.len()
    );

    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
    if let Some(normals) = normals {
        mesh.set_normals(normals);
    }
    Ok(mesh)
}

/// Whitespace token stream that remembers source lines for error messages
struct Tokens<'a> {
    items: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str, skip_lines: usize) -> Self {
        let items = content
            .lines()
            .enumerate()
            .skip(skip_lines)
            .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)))
            .collect();
        Self { items, pos: 0 }
    }

    fn line(&self) -> usize {
        self.items
            .get(self.pos.min(self.items.len().saturating_sub(1)))
            .map(|(line, _)| *line)
            .unwrap_or(0)
    }

    fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.pos)
    }

    fn next_word(&mut self) -> Option<&'a str> {
        let item = self.items.get(self.pos)?;
        self.pos += 1;
        Some(item.1)
    }

    fn peek_word(&self) -> Option<&'a str> {
        self.items.get(self.pos).map(|(_, t)| *t)
    }

    fn word(&mut self) -> std::result::Result<&'a str, IoError> {
        let line = self.line();
        self.next_word()
            .ok_or_else(|| IoError::parse(line, "unexpected end of file"))
    }

    fn expect(&mut self, keyword: &str) -> std::result::Result<(), IoError> {
        let line = self.line();
        let word = self.word()?;
        if word.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(IoError::parse(
                line,
                format!("expected '{}', found '{}'", keyword, word),
            ))
        }
    }

    fn usize(&mut self) -> std::result::Result<usize, IoError> {
        let line = self.line();
        let word = self.word()?;
        word.parse()
            .map_err(|_| IoError::parse(line, format!("expected an integer, found '{}'", word)))
    }

    fn f32(&mut self) -> std::result::Result<f32, IoError> {
        let line = self.line();
        let word = self.word()?;
        word.parse()
            .map_err(|_| IoError::parse(line, format!("expected a number, found '{}'", word)))
    }

    fn points(&mut self, n: usize) -> std::result::Result<Vec<Point3f>, IoError> {
        // header counts are untrusted; never reserve more than the file can hold
        let mut points = Vec::with_capacity(n.min(self.remaining() / 3));
        for _ in 0..n {
            points.push(Point3f::new(self.f32()?, self.f32()?, self.f32()?));
        }
        Ok(points)
    }

    /// Read a cell array header and body in either legacy layout
    fn cells(&mut self) -> std::result::Result<Vec<Vec<usize>>, IoError> {
        let count = self.usize()?;
        let size = self.usize()?;

        if self.peek_word().map(|w| w.eq_ignore_ascii_case("OFFSETS")) == Some(true) {
            self.word()?;
            let _type = self.word()?;
            let offsets = (0..count)
                .map(|_| self.usize())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            self.expect("CONNECTIVITY")?;
            let _type = self.word()?;
            let connectivity = (0..size)
                .map(|_| self.usize())
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let line = self.line();
            return offsets
                .windows(2)
                .map(|w| {
                    connectivity
                        .get(w[0]..w[1])
                        .map(|c| c.to_vec())
                        .ok_or_else(|| IoError::parse(line, "cell offsets exceed connectivity"))
                })
                .collect();
        }

        let mut cells = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let n = self.usize()?;
            let cell = (0..n)
                .map(|_| self.usize())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            cells.push(cell);
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "# vtk DataFile Version 3.0
Liver_IVC
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0  1 0 0
0 1 0  0 0 1
POLYGONS 4 16
3 0 2 1
3 0 1 3
3 0 3 2
3 1 2 3
";

    #[test]
    fn test_parse_classic_polygons() {
        let mesh = parse_polydata(TETRA).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 4);
        assert_eq!(mesh.vertices[3], Point3f::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.faces[1], [0, 1, 3]);
    }

    #[test]
    fn test_parse_offsets_layout_and_strips() {
        let content = "# vtk DataFile Version 5.1
strip
ASCII
DATASET POLYDATA
POINTS 5 float
0 0 0 1 0 0 0 1 0 1 1 0 2 0 0
TRIANGLE_STRIPS 2 4
OFFSETS vtktypeint64
0 4
CONNECTIVITY vtktypeint64
0 1 2 3
POLYGONS 2 3
OFFSETS vtktypeint64
0 3
CONNECTIVITY vtktypeint64
1 4 3
";
        let mesh = parse_polydata(content).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [2, 1, 3], [1, 4, 3]]);
    }

    #[test]
    fn test_point_normals_are_read() {
        let content = format!(
            "{}POINT_DATA 4\nNORMALS Normals float\n0 0 1 0 0 1 0 0 1 0 0 1\n",
            TETRA
        );
        let mesh = parse_polydata(&content).unwrap();
        assert_eq!(mesh.normals.as_ref().map(|n| n.len()), Some(4));
    }

    #[test]
    fn test_binary_files_are_rejected() {
        let content = TETRA.replace("ASCII", "BINARY");
        assert!(matches!(
            parse_polydata(&content),
            Err(IoError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_truncated_points_report_a_line() {
        let content = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 2 float\n0 0 0 1\n";
        match parse_polydata(content) {
            Err(IoError::ParseError { line, .. }) => assert_eq!(line, 6),
            other => panic!("expected a parse error, got {:?}", other.map(|m| m.vertex_count())),
        }
    }

    #[test]
    fn test_oversized_counts_fail_as_parse_errors() {
        let points = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 99999999999999 float\n0 0 0\n";
        assert!(matches!(
            parse_polydata(points),
            Err(IoError::ParseError { .. })
        ));

        let cells = TETRA.replace("POLYGONS 4 16", "POLYGONS 99999999999999 16");
        assert!(matches!(
            parse_polydata(&cells),
            Err(IoError::ParseError { .. })
        ));
    }

    #[test]
    fn test_out_of_range_cell_is_rejected() {
        let content = TETRA.replace("3 1 2 3", "3 1 2 7");
        assert!(parse_polydata(&content).is_err());
    }
}
