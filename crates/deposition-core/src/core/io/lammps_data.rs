use crate::core::models::cell::CellBounds;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LammpsDataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Header declares {expected} atoms but the Atoms section lists {found}")]
    AtomCount { expected: usize, found: usize },
    #[error("Velocities section lists {found} atoms, expected {expected}")]
    VelocityCount { expected: usize, found: usize },
    #[error("Atom {atom_id} appears in Velocities but not in Atoms")]
    UnknownAtom { atom_id: usize },
    #[error("Missing '{0}' in data file")]
    Missing(&'static str),
}

/// The content of a LAMMPS data file in `atom_style charge`.
///
/// Atom types are the 1-based ids LAMMPS uses; `masses[t - 1]` is the mass of
/// type `t`. Charges are written as zero and ignored on reading.
#[derive(Debug, Clone, PartialEq)]
pub struct LammpsData {
    pub bounds: CellBounds,
    pub masses: Vec<f64>,
    pub atom_types: Vec<usize>,
    pub coordinates: Vec<Point3<f64>>,
    pub velocities: Option<Vec<Vector3<f64>>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Masses,
    Atoms,
    Velocities,
    Ignored,
}

fn parse_error(line: usize, message: impl Into<String>) -> LammpsDataError {
    LammpsDataError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    line: usize,
) -> Result<T, LammpsDataError> {
    let raw = fields
        .get(index)
        .ok_or_else(|| parse_error(line, format!("expected at least {} fields", index + 1)))?;
    raw.parse()
        .map_err(|_| parse_error(line, format!("invalid value '{}'", raw)))
}

fn parse_bounds(fields: &[&str], line: usize) -> Result<(f64, f64), LammpsDataError> {
    Ok((parse_field(fields, 0, line)?, parse_field(fields, 1, line)?))
}

impl LammpsData {
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), LammpsDataError> {
        let b = &self.bounds;
        writeln!(writer, "LAMMPS data file written by depokit")?;
        writeln!(writer)?;
        writeln!(writer, "{} atoms", self.coordinates.len())?;
        writeln!(writer, "{} atom types", self.masses.len())?;
        writeln!(writer)?;
        writeln!(writer, "{:.10} {:.10} xlo xhi", b.x_min, b.x_max)?;
        writeln!(writer, "{:.10} {:.10} ylo yhi", b.y_min, b.y_max)?;
        writeln!(writer, "{:.10} {:.10} zlo zhi", b.z_min, b.z_max)?;
        if !b.is_orthogonal() {
            writeln!(
                writer,
                "{:.10} {:.10} {:.10} xy xz yz",
                b.tilt_xy, b.tilt_xz, b.tilt_yz
            )?;
        }

        writeln!(writer, "\nMasses\n")?;
        for (index, mass) in self.masses.iter().enumerate() {
            writeln!(writer, "{} {}", index + 1, mass)?;
        }

        writeln!(writer, "\nAtoms # charge\n")?;
        for (index, (atom_type, p)) in self.atom_types.iter().zip(&self.coordinates).enumerate() {
            writeln!(
                writer,
                "{} {} 0.0 {:.10} {:.10} {:.10}",
                index + 1,
                atom_type,
                p.x,
                p.y,
                p.z
            )?;
        }

        if let Some(velocities) = &self.velocities {
            writeln!(writer, "\nVelocities\n")?;
            for (index, v) in velocities.iter().enumerate() {
                writeln!(writer, "{} {:.10} {:.10} {:.10}", index + 1, v.x, v.y, v.z)?;
            }
        }
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), LammpsDataError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a data file as written by LAMMPS' `write_data` command.
    ///
    /// Atoms are returned in ascending id order; sections other than
    /// `Masses`, `Atoms` and `Velocities` are skipped.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, LammpsDataError> {
        let mut section = Section::Header;
        let mut declared_atoms = None;
        let mut x = None;
        let mut y = None;
        let mut z = None;
        let mut tilts = (0.0, 0.0, 0.0);
        let mut masses: Vec<(usize, f64)> = Vec::new();
        let mut atoms: Vec<(usize, usize, Point3<f64>)> = Vec::new();
        let mut velocities: Vec<(usize, Vector3<f64>)> = Vec::new();

        // The first line is a free-form title.
        for (index, line) in reader.lines().enumerate().skip(1) {
            let line_num = index + 1;
            let line = line?;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            if content.starts_with(|c: char| c.is_ascii_alphabetic()) {
                section = match content {
                    "Masses" => Section::Masses,
                    "Atoms" => Section::Atoms,
                    "Velocities" => Section::Velocities,
                    _ => Section::Ignored,
                };
                continue;
            }

            let fields: Vec<&str> = content.split_whitespace().collect();
            match section {
                Section::Header => {
                    if content.ends_with("atom types") {
                        continue;
                    } else if content.ends_with("atoms") {
                        declared_atoms = Some(parse_field::<usize>(&fields, 0, line_num)?);
                    } else if content.ends_with("xlo xhi") {
                        x = Some(parse_bounds(&fields, line_num)?);
                    } else if content.ends_with("ylo yhi") {
                        y = Some(parse_bounds(&fields, line_num)?);
                    } else if content.ends_with("zlo zhi") {
                        z = Some(parse_bounds(&fields, line_num)?);
                    } else if content.ends_with("xy xz yz") {
                        tilts = (
                            parse_field(&fields, 0, line_num)?,
                            parse_field(&fields, 1, line_num)?,
                            parse_field(&fields, 2, line_num)?,
                        );
                    }
                }
                Section::Masses => {
                    masses.push((
                        parse_field(&fields, 0, line_num)?,
                        parse_field(&fields, 1, line_num)?,
                    ));
                }
                Section::Atoms => {
                    // id type q x y z [ix iy iz]
                    let id = parse_field(&fields, 0, line_num)?;
                    let atom_type = parse_field(&fields, 1, line_num)?;
                    let position = Point3::new(
                        parse_field(&fields, 3, line_num)?,
                        parse_field(&fields, 4, line_num)?,
                        parse_field(&fields, 5, line_num)?,
                    );
                    atoms.push((id, atom_type, position));
                }
                Section::Velocities => {
                    let id = parse_field(&fields, 0, line_num)?;
                    let velocity = Vector3::new(
                        parse_field(&fields, 1, line_num)?,
                        parse_field(&fields, 2, line_num)?,
                        parse_field(&fields, 3, line_num)?,
                    );
                    velocities.push((id, velocity));
                }
                Section::Ignored => {}
            }
        }

        let declared_atoms = declared_atoms.ok_or(LammpsDataError::Missing("atoms"))?;
        if atoms.len() != declared_atoms {
            return Err(LammpsDataError::AtomCount {
                expected: declared_atoms,
                found: atoms.len(),
            });
        }
        let (x_min, x_max) = x.ok_or(LammpsDataError::Missing("xlo xhi"))?;
        let (y_min, y_max) = y.ok_or(LammpsDataError::Missing("ylo yhi"))?;
        let (z_min, z_max) = z.ok_or(LammpsDataError::Missing("zlo zhi"))?;

        atoms.sort_by_key(|(id, _, _)| *id);
        masses.sort_by_key(|(id, _)| *id);

        let velocities = if velocities.is_empty() {
            None
        } else {
            if velocities.len() != atoms.len() {
                return Err(LammpsDataError::VelocityCount {
                    expected: atoms.len(),
                    found: velocities.len(),
                });
            }
            let mut ordered = vec![Vector3::zeros(); atoms.len()];
            for (atom_id, velocity) in velocities {
                let slot = atoms
                    .binary_search_by_key(&atom_id, |(id, _, _)| *id)
                    .map_err(|_| LammpsDataError::UnknownAtom { atom_id })?;
                ordered[slot] = velocity;
            }
            Some(ordered)
        };

        Ok(Self {
            bounds: CellBounds {
                x_min,
                x_max,
                y_min,
                y_max,
                z_min,
                z_max,
                tilt_xy: tilts.0,
                tilt_xz: tilts.1,
                tilt_yz: tilts.2,
            },
            masses: masses.into_iter().map(|(_, mass)| mass).collect(),
            atom_types: atoms.iter().map(|(_, t, _)| *t).collect(),
            coordinates: atoms.into_iter().map(|(_, _, p)| p).collect(),
            velocities,
        })
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, LammpsDataError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}
