//! File handles and the C-style file builtins.
//!
//! A [`FileHandle`] is shared: copies of a File value refer to the same open
//! file, and closing one closes them all. Operations on a closed handle fail
//! with an error value rather than touching the OS.

use std::cell::RefCell;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Chr, Environment, arg, exact};

const CLOSED: &str = "Unable to read file.";
const CLOSE_FAILED: &str = "Failed to close file.";
const AT_EOF: &str = "File closed or reached end of file.";
const READ_CHAR_FAILED: &str = "Unable to read character from file.";
const WRITE_CHAR_FAILED: &str = "Unable to write character to file.";
const FGETS_FAILED: &str = "Already at the end of the file, or some error occurred.";
const SEEK_FAILED: &str = "Unable to seek in file.";
const TELL_FAILED: &str = "Unable to determine file position.";

/// An open (or closed) file together with the name and mode it was opened with.
#[derive(Debug, Clone)]
pub struct FileHandle {
    file: Rc<RefCell<Option<File>>>,
    name: String,
    mode: String,
}

/// Open options for a C `fopen` mode. A single `b` may follow the letter
/// or the `+` and is ignored.
fn open_options(mode: &str) -> Option<OpenOptions> {
    let mut options = OpenOptions::new();
    match mode {
        "r" | "rb" => options.read(true),
        "w" | "wb" => options.write(true).create(true).truncate(true),
        "a" | "ab" => options.append(true).create(true),
        "r+" | "rb+" | "r+b" => options.read(true).write(true),
        "w+" | "wb+" | "w+b" => options.read(true).write(true).create(true).truncate(true),
        "a+" | "ab+" | "a+b" => options.read(true).append(true).create(true),
        _ => return None,
    };
    Some(options)
}

impl FileHandle {
    pub fn open(name: &str, mode: &str) -> Result<Self, Error> {
        let failure = |reason: &dyn fmt::Display| {
            Error::File(format!(
                "Unable to open file '{name}' with mode '{mode}': {reason}"
            ))
        };
        let options = open_options(mode).ok_or_else(|| failure(&"invalid mode"))?;
        let file = options.open(name).map_err(|e| failure(&e))?;

        tracing::debug!(name, mode, "file opened");
        Ok(FileHandle {
            file: Rc::new(RefCell::new(Some(file))),
            name: name.to_owned(),
            mode: mode.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.file.borrow().is_some()
    }

    /// Run `op` on the open file, or fail if the handle has been closed.
    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> Result<T, Error>) -> Result<T, Error> {
        let mut slot = self.file.borrow_mut();
        let file = slot.as_mut().ok_or_else(|| Error::File(CLOSED.into()))?;
        op(file)
    }

    fn close(&self) -> Result<(), Error> {
        match self.file.borrow_mut().take() {
            Some(file) => {
                tracing::debug!(name = %self.name, "file closed");
                drop(file);
                Ok(())
            }
            None => Err(Error::File(CLOSE_FAILED.into())),
        }
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<File[{}]: {}>", self.mode, self.name)
    }
}

fn file_error(message: &str) -> impl FnOnce(io::Error) -> Error + '_ {
    move |_| Error::File(message.to_owned())
}

/// Read one byte, `None` at end of file.
fn read_byte(file: &mut File) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match file.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// Read one UTF-8 encoded character, `None` at end of file.
fn read_char(file: &mut File) -> io::Result<Option<char>> {
    let Some(lead) = read_byte(file)? else {
        return Ok(None);
    };
    let width = match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Err(io::ErrorKind::InvalidData.into()),
    };

    let mut bytes = vec![lead];
    for _ in 1..width {
        bytes.push(read_byte(file)?.ok_or(io::ErrorKind::UnexpectedEof)?);
    }
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .map(Some)
        .ok_or_else(|| io::ErrorKind::InvalidData.into())
}

/// Read up to `limit` bytes, stopping after a newline.
fn read_line(file: &mut File, limit: usize) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    while line.len() < limit {
        match read_byte(file)? {
            Some(byte) => {
                line.push(byte);
                if byte == b'\n' {
                    break;
                }
            }
            None => break,
        }
    }
    Ok(line)
}

pub(crate) fn fopen(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [name, mode] = exact::<2>("fopen", args)?;
    let name: String = arg("fopen", 1, name)?;
    let mode: String = arg("fopen", 2, mode)?;
    FileHandle::open(&name, &mode).map(Value::File)
}

pub(crate) fn fclose(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle] = exact::<1>("fclose", args)?;
    let handle: FileHandle = arg("fclose", 1, handle)?;
    handle.close().map(|()| Value::Ok)
}

pub(crate) fn getc(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle] = exact::<1>("getc", args)?;
    let handle: FileHandle = arg("getc", 1, handle)?;
    handle.with_file(|file| match read_char(file) {
        Ok(Some(c)) => Ok(Value::Char(c.to_string())),
        Ok(None) => Err(Error::File(AT_EOF.into())),
        Err(_) => Err(Error::File(READ_CHAR_FAILED.into())),
    })
}

pub(crate) fn putc(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle, c] = exact::<2>("putc", args)?;
    let handle: FileHandle = arg("putc", 1, handle)?;
    let Chr(c) = arg("putc", 2, c)?;
    handle.with_file(|file| {
        file.write_all(c.as_bytes())
            .map(|()| Value::Ok)
            .map_err(file_error(WRITE_CHAR_FAILED))
    })
}

/// `(fgets file n)` reads at most `n - 1` bytes, like C's `fgets`.
pub(crate) fn fgets(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle, size] = exact::<2>("fgets", args)?;
    let handle: FileHandle = arg("fgets", 1, handle)?;
    let size: i64 = arg("fgets", 2, size)?;
    let limit = usize::try_from(size.saturating_sub(1)).unwrap_or(0);

    handle.with_file(|file| {
        let line = read_line(file, limit).map_err(file_error(FGETS_FAILED))?;
        if line.is_empty() && limit > 0 {
            return Err(Error::File(FGETS_FAILED.into()));
        }
        Ok(Value::String(String::from_utf8_lossy(&line).into_owned()))
    })
}

pub(crate) fn fseek(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle, offset, whence] = exact::<3>("fseek", args)?;
    let handle: FileHandle = arg("fseek", 1, handle)?;
    let offset: i64 = arg("fseek", 2, offset)?;
    let whence: i64 = arg("fseek", 3, whence)?;

    handle.with_file(|file| {
        let target = match whence {
            0 => SeekFrom::Start(u64::try_from(offset).map_err(|_| Error::File(SEEK_FAILED.into()))?),
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            other => {
                return Err(Error::File(format!(
                    "Unexpected value at argument #3 to 'fseek'. Got {other}; expected \
                     0 (from beginning), 1 (from current position), or 2 (from end)."
                )));
            }
        };
        file.seek(target)
            .map(|_| Value::Ok)
            .map_err(file_error(SEEK_FAILED))
    })
}

pub(crate) fn ftell(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle] = exact::<1>("ftell", args)?;
    let handle: FileHandle = arg("ftell", 1, handle)?;
    handle.with_file(|file| {
        file.stream_position()
            .ok()
            .and_then(|pos| i64::try_from(pos).ok())
            .map(Value::Long)
            .ok_or_else(|| Error::File(TELL_FAILED.into()))
    })
}

pub(crate) fn rewind(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [handle] = exact::<1>("rewind", args)?;
    let handle: FileHandle = arg("rewind", 1, handle)?;
    handle.with_file(|file| {
        file.rewind()
            .map(|()| Value::Ok)
            .map_err(file_error(SEEK_FAILED))
    })
}
