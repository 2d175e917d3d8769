use bincode;
use error::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable home for one table of records. Every write replaces the whole table; the tables kept
/// here are small (one row per active plot feature) so there is no incremental format.
pub trait Backend<T> {
    /// Read the full table. A table which was never written is empty, not an error.
    fn load(&self) -> Result<Vec<T>, Error>;
    /// Replace the full table.
    fn store(&mut self, rows: &[T]) -> Result<(), Error>;
    /// Where the table lives, for log messages.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Human-readable, used for timed state an operator may want to inspect.
    Json,
    Bincode,
}

/// A table stored as a single file. Writes go to a sibling temporary file which is then renamed
/// over the original, so a crash mid-write leaves the previous table intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    encoding: Encoding,
}

impl FileBackend {
    pub fn new<P: Into<PathBuf>>(path: P, encoding: Encoding) -> FileBackend {
        FileBackend { path: path.into(), encoding }
    }

    pub fn json<P: Into<PathBuf>>(path: P) -> FileBackend {
        Self::new(path, Encoding::Json)
    }

    pub fn bincode<P: Into<PathBuf>>(path: P) -> FileBackend {
        Self::new(path, Encoding::Bincode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl<T: Serialize + DeserializeOwned> Backend<T> for FileBackend {
    fn load(&self) -> Result<Vec<T>, Error> {
        if !self.path.exists() { return Ok(Vec::new()) }

        let raw = fs::read(&self.path)?;
        if raw.is_empty() { return Ok(Vec::new()) }

        Ok(match self.encoding {
            Encoding::Json => serde_json::from_slice(&raw)?,
            Encoding::Bincode => bincode::deserialize(&raw)?
        })
    }

    fn store(&mut self, rows: &[T]) -> Result<(), Error> {
        let raw = match self.encoding {
            Encoding::Json => serde_json::to_vec_pretty(rows)?,
            Encoding::Bincode => bincode::serialize(rows)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&raw)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}


/// A table which lives only as long as the process. Used for tests and scratch runs.
#[derive(Debug, Clone)]
pub struct Volatile<T> {
    rows: Vec<T>,
    /// When set, every store fails. Lets tests exercise best-effort persistence.
    pub fail_writes: bool,
}

impl<T> Volatile<T> {
    pub fn new() -> Volatile<T> {
        Volatile { rows: Vec::new(), fail_writes: false }
    }

    pub fn with_rows(rows: Vec<T>) -> Volatile<T> {
        Volatile { rows, fail_writes: false }
    }
}

impl<T: Clone> Backend<T> for Volatile<T> {
    fn load(&self) -> Result<Vec<T>, Error> {
        Ok(self.rows.clone())
    }

    fn store(&mut self, rows: &[T]) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Error::Storage("volatile table is read-only".into()))
        }
        self.rows = rows.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".into()
    }
}


/// Where the tables of one service live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Directory(PathBuf),
    /// Nothing survives the process.
    Volatile,
}

impl Storage {
    /// Open the table `name`. For a directory this is a file of that name inside it.
    pub fn table<T>(&self, name: &str, encoding: Encoding) -> Box<dyn Backend<T>>
        where T: Serialize + DeserializeOwned + Clone + 'static
    {
        match *self {
            Storage::Directory(ref dir) => Box::new(FileBackend::new(dir.join(name), encoding)),
            Storage::Volatile => Box::new(Volatile::new()),
        }
    }
}




#[cfg(test)]
mod tests {
    use super::*;
    use super::test_dir;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Row { key: String, value: i64 }

    fn rows() -> Vec<Row> {
        vec![Row { key: "a".into(), value: 1 }, Row { key: "b".into(), value: -7 }]
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = test_dir::fresh("missing");
        let backend = FileBackend::json(dir.join("nothing.json"));
        let loaded: Vec<Row> = backend.load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn json_file_survives_reopen() {
        let dir = test_dir::fresh("json");
        let path = dir.join("table.json");
        FileBackend::json(&path).store(&rows()).unwrap();

        let reopened = FileBackend::json(&path);
        let loaded: Vec<Row> = reopened.load().unwrap();
        assert_eq!(loaded, rows());
        assert!(!dir.join("table.json.tmp").exists());
    }

    #[test]
    fn bincode_file_survives_reopen() {
        let dir = test_dir::fresh("bin");
        let path = dir.join("nested").join("table.bin");
        FileBackend::bincode(&path).store(&rows()).unwrap();
        let loaded: Vec<Row> = FileBackend::bincode(&path).load().unwrap();
        assert_eq!(loaded, rows());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = test_dir::fresh("corrupt");
        let path = dir.join("table.json");
        fs::write(&path, b"{ not json").unwrap();
        let loaded: Result<Vec<Row>, Error> = FileBackend::json(&path).load();
        assert!(loaded.is_err());
    }

    #[test]
    fn volatile_can_refuse_writes() {
        let mut v = Volatile::with_rows(rows());
        v.fail_writes = true;
        assert!(v.store(&[]).is_err());
        assert_eq!(v.load().unwrap(), rows());
    }
}
