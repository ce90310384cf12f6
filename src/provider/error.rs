use std::convert::From;
use std::error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

#[derive(Debug)]
pub enum ErrorKind {
    InvalidMonth,
    InvalidTimezone,
    ConfigParse,
    LibraryAccess,
    ThumbnailDecode,
    MetadataRead,
    WatchError,
    IOError(io::Error),
}

impl Error {
    pub fn new(kind: ErrorKind, msg: &str) -> Self {
        Error {
            kind,
            message: Some(msg.to_owned()),
        }
    }

    pub fn is_invalid_month(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidMonth)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind,
            message: None,
        }
    }
}

impl From<io::ErrorKind> for Error {
    fn from(kind: io::ErrorKind) -> Error {
        Error::from(io::Error::from(kind))
    }
}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Error {
        Error::from(ErrorKind::IOError(io_error))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Error {
        Error::new(
            ErrorKind::ConfigParse,
            &format!("Could not parse configuration: {}", err),
        )
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Error {
        Error::new(ErrorKind::ThumbnailDecode, &err.to_string())
    }
}

impl From<exif::Error> for Error {
    fn from(err: exif::Error) -> Error {
        match err {
            exif::Error::Io(io_error) => Error::from(io_error),
            err => Error::new(ErrorKind::MetadataRead, &err.to_string()),
        }
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Error {
        Error::new(ErrorKind::WatchError, &err.to_string())
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let Error { kind, message } = err;
        match kind {
            ErrorKind::IOError(err) => err,
            kind => io::Error::new(
                io::ErrorKind::InvalidInput,
                message.unwrap_or_else(|| kind.as_str()),
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.kind.as_str(), msg),
            None => write!(f, "{}", self.kind.as_str()),
        }
    }
}

impl error::Error for Error {}

impl ErrorKind {
    pub fn as_str(&self) -> String {
        match self {
            ErrorKind::InvalidMonth => "invalid month".to_owned(),
            ErrorKind::InvalidTimezone => "invalid timezone".to_owned(),
            ErrorKind::ConfigParse => "invalid configuration".to_owned(),
            ErrorKind::LibraryAccess => "photo library not accessible".to_owned(),
            ErrorKind::ThumbnailDecode => "could not decode image".to_owned(),
            ErrorKind::MetadataRead => "could not read photo metadata".to_owned(),
            ErrorKind::WatchError => "could not watch photo library".to_owned(),
            ErrorKind::IOError(err) => err.to_string(),
        }
    }
}
