//! Source files, byte-offset to line/column mapping, and the read-file hook.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Index into the [`SourceSet`](struct.SourceSet.html).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FileId(pub u32);

/// A source location. Offsets are byte positions into the owning file;
/// lines and columns are 1-based.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Loc {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Loc {
    /// Smallest location covering both `a` and `b` (same file).
    pub fn merge(a: Loc, b: Loc) -> Loc {
        Loc {
            file: a.file,
            start: a.start.min(b.start),
            end: a.end.max(b.end),
            line: a.line,
            col: a.col,
            end_line: b.end_line,
            end_col: b.end_col,
        }
    }
}

pub struct SourceFile {
    name: String,
    path: PathBuf,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(path: PathBuf, text: String) -> SourceFile {
        let name = path.to_string_lossy().replace('\\', "/");
        let line_starts = line_starts(&text);
        SourceFile {
            name,
            path,
            text,
            line_starts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Directory !include and !binary paths are resolved against.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let col = self.text[self.line_starts[line]..offset].chars().count();
        (line as u32 + 1, col as u32 + 1)
    }
}

/// Line starts for `\n`, `\r\n` and lone-`\r` terminated lines alike.
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let bytes = text.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'\n' => starts.push(index + 1),
            b'\r' => {
                if bytes.get(index + 1) == Some(&b'\n') {
                    index += 1;
                }
                starts.push(index + 1);
            }
            _ => {}
        }
        index += 1;
    }
    starts
}

#[derive(Default)]
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    pub fn new() -> SourceSet {
        SourceSet::default()
    }

    pub fn add(&mut self, path: PathBuf, text: String) -> FileId {
        self.files.push(SourceFile::new(path, text));
        FileId(self.files.len() as u32 - 1)
    }

    pub fn get(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn name(&self, id: FileId) -> &str {
        self.get(id).name()
    }

    pub fn loc(&self, file: FileId, start: usize, end: usize) -> Loc {
        let source = self.get(file);
        let (line, col) = source.line_col(start);
        let (end_line, end_col) = source.line_col(end);
        Loc {
            file,
            start,
            end,
            line,
            col,
            end_line,
            end_col,
        }
    }
}

/// File access used for the root source, `!include` and `!binary`.
///
/// Injectable so that tests and editor integrations can serve in-memory
/// buffers instead of touching the file system.
pub trait SourceReader {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The default reader; resolves paths against the process working directory.
pub struct FsReader;

impl SourceReader for FsReader {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// In-memory reader for tests.
#[derive(Default)]
pub struct MemReader {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemReader {
    pub fn new() -> MemReader {
        MemReader::default()
    }

    pub fn insert<P: Into<PathBuf>, B: Into<Vec<u8>>>(&mut self, path: P, bytes: B) {
        self.files.insert(path.into(), bytes.into());
    }
}

impl SourceReader for MemReader {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}
