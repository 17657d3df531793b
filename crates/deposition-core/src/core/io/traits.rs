use crate::core::models::state::State;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing atomic structure formats.
///
/// Implementors handle format-specific parsing and serialization of a
/// [`State`]. Path-based helpers are provided on top of the reader/writer
/// methods.
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a state from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<State, Self::Error>;

    /// Writes a state to a writer, with a free-form comment where the format
    /// has room for one.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(state: &State, comment: &str, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a state from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<State, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a state to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        state: &State,
        comment: &str,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(state, comment, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
