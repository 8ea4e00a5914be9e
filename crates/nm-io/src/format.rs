use std::path::Path;
use std::str::FromStr;

use nm_core::{Error, Morphology};
use tracing::debug;

use crate::swc::{read_swc, write_swc};
use crate::ugx::{read_ugx, write_ugx};

/// A file format that can be read into and written from a [`Morphology`].
pub trait Codec {
    fn read(&self, path: &Path) -> Result<Morphology, Error>;
    fn write(&self, m: &Morphology, path: &Path) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwcCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct UgxCodec;

impl Codec for SwcCodec {
    fn read(&self, path: &Path) -> Result<Morphology, Error> {
        read_swc(path)
    }

    fn write(&self, m: &Morphology, path: &Path) -> Result<(), Error> {
        write_swc(m, path)
    }
}

impl Codec for UgxCodec {
    fn read(&self, path: &Path) -> Result<Morphology, Error> {
        read_ugx(path)
    }

    fn write(&self, m: &Morphology, path: &Path) -> Result<(), Error> {
        write_ugx(m, path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Swc,
    Ugx,
}

impl Format {
    /// Picks the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(format!("{} has no extension", path.display())))?;
        ext.parse()
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Swc => "swc",
            Self::Ugx => "ugx",
        }
    }

    pub fn read(self, path: &Path) -> Result<Morphology, Error> {
        match self {
            Self::Swc => SwcCodec.read(path),
            Self::Ugx => UgxCodec.read(path),
        }
    }

    pub fn write(self, m: &Morphology, path: &Path) -> Result<(), Error> {
        match self {
            Self::Swc => SwcCodec.write(m, path),
            Self::Ugx => UgxCodec.write(m, path),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swc" => Ok(Self::Swc),
            "ugx" => Ok(Self::Ugx),
            other => Err(Error::UnsupportedFormat(other.to_owned())),
        }
    }
}

/// Reads a morphology, choosing the codec by extension.
pub fn read_morphology(path: impl AsRef<Path>) -> Result<Morphology, Error> {
    let path = path.as_ref();
    Format::from_path(path)?.read(path)
}

/// Writes a morphology, choosing the codec by extension.
pub fn write_morphology(m: &Morphology, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    Format::from_path(path)?.write(m, path)
}

/// Reads `input` and writes it to `output`, each in the format its
/// extension names.
pub fn convert(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<(), Error> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let from = Format::from_path(input)?;
    let to = Format::from_path(output)?;
    debug!(?from, ?to, "convert");
    let m = from.read(input)?;
    to.write(&m, output)
}

pub fn swc_to_ugx(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<(), Error> {
    let m = read_swc(input)?;
    write_ugx(&m, output)
}

pub fn ugx_to_swc(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<(), Error> {
    let m = read_ugx(input)?;
    write_swc(&m, output)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use nm_core::Error;

    use crate::{Format, convert, read_morphology, read_swc, swc_to_ugx, ugx_to_swc};

    const CELL: &str = "1 1 0 0 0 3 -1\n2 3 2 0 0 1 1\n3 3 4 1 0 0.5 2\n4 2 -2 0 0 0.25 1\n";

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.swc")).expect("swc"), Format::Swc);
        assert_eq!(Format::from_path(Path::new("B.UGX")).expect("ugx"), Format::Ugx);
        assert!(matches!(
            Format::from_path(Path::new("cell.obj")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Format::from_path(Path::new("cell")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn swc_ugx_swc_preserves_structure() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let swc = dir.path().join("cell.swc");
        let ugx = dir.path().join("cell.ugx");
        let back = dir.path().join("back.swc");
        fs::write(&swc, CELL).expect("write input");

        swc_to_ugx(&swc, &ugx).expect("swc -> ugx");
        ugx_to_swc(&ugx, &back).expect("ugx -> swc");

        let original = read_swc(&swc).expect("read original");
        let restored = read_swc(&back).expect("read restored");
        assert_eq!(original, restored);
    }

    #[test]
    fn convert_dispatches_on_extension() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let swc = dir.path().join("cell.swc");
        let ugx = dir.path().join("cell.ugx");
        fs::write(&swc, CELL).expect("write input");

        convert(&swc, &ugx).expect("convert");
        let m = read_morphology(&ugx).expect("read ugx");
        assert_eq!(m.len(), 4);
        assert_eq!(m.num_edges(), 3);

        let bad = dir.path().join("cell.txt");
        assert!(matches!(convert(&swc, &bad), Err(Error::UnsupportedFormat(_))));
    }
}
