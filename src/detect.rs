use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// HDF5 format signature
const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];

/// First non-zero user-block offset where the signature may live
const FIRST_USER_BLOCK: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Hdf5,
    Hdf4OrUnknown,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Hdf5 => write!(f, "HDF5"),
            ContainerKind::Hdf4OrUnknown => write!(f, "HDF4/UNKNOWN"),
        }
    }
}

/// Probe the file signature. Read failures of any kind map to `Hdf4OrUnknown`.
pub fn detect_container<P: AsRef<Path>>(path: P) -> ContainerKind {
    let path = path.as_ref();
    match find_hdf5_signature(path) {
        Ok(true) => ContainerKind::Hdf5,
        Ok(false) => ContainerKind::Hdf4OrUnknown,
        Err(e) => {
            debug!("Signature probe failed for {}: {}", path.display(), e);
            ContainerKind::Hdf4OrUnknown
        }
    }
}

/// The signature sits at offset 0 or at a power-of-two user-block offset (512, 1024, ...)
fn find_hdf5_signature(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let sig_len = HDF5_SIGNATURE.len() as u64;

    let mut offset = 0u64;
    while offset + sig_len <= file_len {
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf)?;
        if buf == HDF5_SIGNATURE {
            debug!("HDF5 signature found at offset {}", offset);
            return Ok(true);
        }
        offset = if offset == 0 { FIRST_USER_BLOCK } else { offset * 2 };
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_signature_at_start() {
        let mut bytes = HDF5_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let file = write_temp(&bytes);
        assert_eq!(detect_container(file.path()), ContainerKind::Hdf5);
    }

    #[test]
    fn test_signature_after_user_block() {
        let mut bytes = vec![0u8; 512];
        bytes.extend_from_slice(&HDF5_SIGNATURE);
        let file = write_temp(&bytes);
        assert_eq!(detect_container(file.path()), ContainerKind::Hdf5);
    }

    #[test]
    fn test_hdf4_magic_is_unknown() {
        // HDF4 files start with ^N^C^S^A
        let file = write_temp(&[0x0e, 0x03, 0x13, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(detect_container(file.path()), ContainerKind::Hdf4OrUnknown);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let kind = detect_container("/nonexistent/path/to/fy4.hdf");
        assert_eq!(kind, ContainerKind::Hdf4OrUnknown);
    }

    #[test]
    fn test_short_file() {
        let file = write_temp(b"\x89HD");
        assert_eq!(detect_container(file.path()), ContainerKind::Hdf4OrUnknown);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ContainerKind::Hdf5.to_string(), "HDF5");
        assert_eq!(ContainerKind::Hdf4OrUnknown.to_string(), "HDF4/UNKNOWN");
    }
}
