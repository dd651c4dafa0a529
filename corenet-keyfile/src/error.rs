use displaydoc::Display;

#[derive(Debug, Display)]
pub enum KeyFileError {
    /// I/O error: {0}
    Io(std::io::Error),
    /// malformed key file: {0}
    Malformed(String),
    /// refusing to overwrite a file that is not a corenet key file (use force)
    RefusingOverwrite,
}

impl std::error::Error for KeyFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyFileError::Io(e) => Some(e),
            _ => None,
        }
    }
}
