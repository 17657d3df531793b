use crate::core::io::traits::StructureFile;
use crate::core::models::state::{State, StateError};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("File ended after {found} of {expected} particle lines")]
    Truncated { expected: usize, found: usize },
    #[error("File contains no frames")]
    Empty,
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid particle count '{0}'")]
    InvalidCount(String),
    #[error("Expected an element symbol and three coordinates, found {0} field(s)")]
    MissingFields(usize),
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
}

/// Plain-text XYZ coordinates: a particle count, a comment line, then one
/// `symbol x y z` line per particle.
///
/// Files holding several frames (trajectories) are accepted; the final frame
/// is returned. Velocities are not part of the format and are read as zero.
pub struct XyzFile;

impl XyzFile {
    fn parse_count(line: &str, line_num: usize) -> Result<usize, XyzError> {
        line.trim().parse().map_err(|_| XyzError::Parse {
            line: line_num,
            kind: XyzParseErrorKind::InvalidCount(line.trim().to_string()),
        })
    }

    fn parse_particle(line: &str, line_num: usize) -> Result<(String, Point3<f64>), XyzError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::MissingFields(fields.len()),
            });
        }
        let mut xyz = [0.0; 3];
        for (slot, raw) in xyz.iter_mut().zip(&fields[1..4]) {
            *slot = raw.trim_end_matches(',').parse().map_err(|_| XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::InvalidFloat(raw.to_string()),
            })?;
        }
        Ok((fields[0].to_string(), Point3::new(xyz[0], xyz[1], xyz[2])))
    }
}

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<State, Self::Error> {
        let mut lines = reader.lines().enumerate();
        let mut last_frame: Option<(Vec<Point3<f64>>, Vec<String>)> = None;

        loop {
            let header = loop {
                match lines.next() {
                    Some((idx, line)) => {
                        let line = line?;
                        if !line.trim().is_empty() {
                            break Some((idx + 1, line));
                        }
                    }
                    None => break None,
                }
            };
            let Some((line_num, header)) = header else {
                break;
            };

            let expected = Self::parse_count(&header, line_num)?;
            // Comment line; may be absent only when the frame is empty.
            match lines.next() {
                Some((_, comment)) => {
                    comment?;
                }
                None if expected > 0 => {
                    return Err(XyzError::Truncated { expected, found: 0 });
                }
                None => {}
            }

            let mut coordinates = Vec::new();
            let mut elements = Vec::new();
            for found in 0..expected {
                let Some((idx, line)) = lines.next() else {
                    return Err(XyzError::Truncated { expected, found });
                };
                let (element, position) = Self::parse_particle(&line?, idx + 1)?;
                elements.push(element);
                coordinates.push(position);
            }
            last_frame = Some((coordinates, elements));
        }

        let (coordinates, elements) = last_frame.ok_or(XyzError::Empty)?;
        Ok(State::at_rest(coordinates, elements)?)
    }

    fn write_to(state: &State, comment: &str, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", state.len())?;
        writeln!(writer, "{}", comment.replace('\n', " "))?;
        for (element, position) in state.elements().iter().zip(state.coordinates()) {
            writeln!(
                writer,
                "{:<3} {:>14.8} {:>14.8} {:>14.8}",
                element, position.x, position.y, position.z
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    const SUBSTRATE: &str = "3\nalumina slab\nAl 0.0 0.0 0.0\nO  1.5 0.0 0.0\nO  0.0 1.5 0.5\n";

    #[test]
    fn read_from_parses_a_single_frame() {
        let state = XyzFile::read_from(&mut Cursor::new(SUBSTRATE)).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.elements(), &["Al", "O", "O"]);
        assert_eq!(state.coordinates()[2], Point3::new(0.0, 1.5, 0.5));
        assert_eq!(state.velocities().len(), 3);
    }

    #[test]
    fn read_from_returns_the_last_frame() {
        let trajectory = "1\nstep 1\nAl 0 0 0\n1\nstep 2\nAl 0 0 4.25\n";
        let state = XyzFile::read_from(&mut Cursor::new(trajectory)).unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state.coordinates()[0].z, 4.25);
    }

    #[test]
    fn read_from_reports_truncated_frames() {
        let result = XyzFile::read_from(&mut Cursor::new("3\ncomment\nAl 0 0 0\n"));
        assert!(matches!(
            result,
            Err(XyzError::Truncated {
                expected: 3,
                found: 1
            })
        ));
    }

    #[test]
    fn read_from_reports_an_oversized_count_as_truncated() {
        let header = format!("{}\ncomment\nAl 0 0 0\n", usize::MAX);
        let result = XyzFile::read_from(&mut Cursor::new(header));
        assert!(matches!(
            result,
            Err(XyzError::Truncated {
                expected: usize::MAX,
                found: 1
            })
        ));
    }

    #[test]
    fn read_from_reports_bad_coordinates_with_line_number() {
        let result = XyzFile::read_from(&mut Cursor::new("1\ncomment\nAl 0 zero 0\n"));
        assert!(matches!(result, Err(XyzError::Parse { line: 3, .. })));
    }

    #[test]
    fn read_from_rejects_empty_input() {
        assert!(matches!(
            XyzFile::read_from(&mut Cursor::new("\n\n")),
            Err(XyzError::Empty)
        ));
    }

    #[test]
    fn write_then_read_preserves_particles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xyz");
        let original = XyzFile::read_from(&mut Cursor::new(SUBSTRATE)).unwrap();

        XyzFile::write_to_path(&original, "written by test", &path).unwrap();
        let reread = XyzFile::read_from_path(&path).unwrap();

        assert_eq!(reread.elements(), original.elements());
        for (a, b) in reread.coordinates().iter().zip(original.coordinates()) {
            assert!((*a - *b).norm() < 1e-7);
        }
    }
}
