//! The content addressable object store.
//!
//! Objects are stored loose, one zlib compressed file per object at
//! `objects/<first two hex digits>/<remaining 38>`. The ref layer only ever
//! asks whether a commit exists; writing and reading are here for the commit
//! command.

pub mod commit;
pub mod kvlm;

use crate::utils::{is_sha, sha};
use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// The identifier of a commit: 40 lowercase hex digits.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitId(String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CommitId {
    type Err = InvalidCommitId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_sha(s) {
            Ok(CommitId(s.to_string()))
        } else {
            Err(InvalidCommitId(s.to_string()))
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("not a commit id: {0:?}")]
pub struct InvalidCommitId(pub String);

/// The one capability the ref layer needs from an object store.
pub trait ObjectStore {
    fn exists(&self, id: &CommitId) -> bool;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn exists(&self, id: &CommitId) -> bool {
        (**self).exists(id)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fmt {
    Commit,
    Blob,
}

impl Fmt {
    pub fn to_str(&self) -> &'static str {
        match self {
            Fmt::Commit => "commit",
            Fmt::Blob => "blob",
        }
    }
}

impl FromStr for Fmt {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "commit" => Ok(Fmt::Commit),
            "blob" => Ok(Fmt::Blob),
            other => anyhow::bail!("unknown object type: {}", other),
        }
    }
}

/// An object together with its `<fmt> <length>\0` header.
#[derive(Debug)]
pub struct GitObject {
    pub fmt: Fmt,
    pub data: Bytes,
}

impl GitObject {
    pub fn new(fmt: Fmt, data: impl Into<Bytes>) -> GitObject {
        GitObject {
            fmt,
            data: data.into(),
        }
    }

    pub fn serialize(&self) -> Bytes {
        let mut data = BytesMut::with_capacity(self.data.len() + 16);

        data.extend_from_slice(self.fmt.to_str().as_bytes());
        data.put_u8(b' ');
        data.extend_from_slice(self.data.len().to_string().as_bytes());
        data.put_u8(b'\0');
        data.extend_from_slice(&self.data);

        data.freeze()
    }

    pub fn from_bytes(mut data: Bytes) -> anyhow::Result<GitObject> {
        let space = data
            .iter()
            .position(|&b| b == b' ')
            .context("failed to split object fmt")?;
        let nul = data
            .iter()
            .position(|&b| b == b'\0')
            .context("failed to split object length")?;
        anyhow::ensure!(space < nul, "malformed object header");

        let fmt = std::str::from_utf8(&data[..space])
            .context("failed to parse object fmt")?
            .parse::<Fmt>()?;
        let length = std::str::from_utf8(&data[space + 1..nul])
            .context("failed to parse object length")?
            .parse::<usize>()
            .context("failed to parse object length")?;

        let body = data.split_off(nul + 1);
        anyhow::ensure!(body.len() == length, "object length mismatch");

        Ok(GitObject { fmt, data: body })
    }
}

pub trait GitObjectTrait {
    fn from_bytes(data: Bytes) -> anyhow::Result<Self>
    where
        Self: Sized;
    fn serialize(&self) -> anyhow::Result<Bytes>;
}

/// Loose object database rooted at a repository's `objects` directory.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
        }
    }

    fn object_path(&self, sha: &str) -> PathBuf {
        self.objects_dir.join(&sha[..2]).join(&sha[2..])
    }

    /// write an object to disk
    ///
    /// returns the sha of the object; writing an object that is already
    /// stored is a no-op.
    pub fn write_object(&self, object: &GitObject) -> anyhow::Result<String> {
        let data = object.serialize();
        let sha = sha(&data);
        let path = self.object_path(&sha);

        if path.exists() {
            return Ok(sha);
        }

        fs::create_dir_all(
            path.parent()
                .context(format!("failed to get path parent: {}", path.display()))?,
        )?;

        let file = fs::File::create(&path)
            .context(format!("failed to create object file: {}", path.display()))?;

        let mut encoder = flate2::write::ZlibEncoder::new(file, flate2::Compression::default());

        encoder
            .write_all(&data)
            .context("failed to write zlib data")?;

        let file = encoder.finish().context("failed to write zlib data")?;
        file.sync_all().context("failed to flush object file")?;

        tracing::debug!(%sha, fmt = object.fmt.to_str(), "wrote object");

        Ok(sha)
    }

    pub fn read_object(&self, sha: &str) -> anyhow::Result<GitObject> {
        anyhow::ensure!(is_sha(sha), "not an object id: {}", sha);

        let path = self.object_path(sha);

        anyhow::ensure!(path.exists(), "object not found: {}", sha);

        let file = fs::File::open(&path)?;

        let mut data = Vec::new();
        flate2::bufread::ZlibDecoder::new(std::io::BufReader::new(file))
            .read_to_end(&mut data)
            .context("failed to read zlib data")?;

        GitObject::from_bytes(Bytes::from(data)).context(format!("corrupt object {}", sha))
    }
}

impl ObjectStore for LooseObjectStore {
    fn exists(&self, id: &CommitId) -> bool {
        self.object_path(id.as_str()).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_id_parsing() {
        let id: CommitId = "a".repeat(40).parse().unwrap();
        assert_eq!(id.as_str(), "a".repeat(40));

        assert_eq!(
            "HEAD".parse::<CommitId>(),
            Err(InvalidCommitId("HEAD".to_string()))
        );
        assert!("ABCDEF0123456789ABCDEF0123456789ABCDEF01"
            .parse::<CommitId>()
            .is_err());
    }

    #[test]
    fn object_header_round_trip() {
        let object = GitObject::new(Fmt::Blob, &b"hello"[..]);
        let raw = object.serialize();

        assert_eq!(&raw[..], b"blob 5\0hello");

        let parsed = GitObject::from_bytes(raw).unwrap();
        assert_eq!(parsed.fmt, Fmt::Blob);
        assert_eq!(&parsed.data[..], b"hello");
    }

    #[test]
    fn object_header_rejects_bad_length() {
        assert!(GitObject::from_bytes(Bytes::from_static(b"blob 9\0hello")).is_err());
        assert!(GitObject::from_bytes(Bytes::from_static(b"tree 5\0hello")).is_err());
    }

    #[test]
    fn write_read_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));

        let sha = store
            .write_object(&GitObject::new(Fmt::Blob, &b"hello"[..]))
            .unwrap();
        assert_eq!(sha, crate::utils::sha(b"blob 5\0hello"));

        let id: CommitId = sha.parse().unwrap();
        assert!(store.exists(&id));
        assert!(!store.exists(&"0".repeat(40).parse().unwrap()));

        let object = store.read_object(&sha).unwrap();
        assert_eq!(object.fmt, Fmt::Blob);
        assert_eq!(&object.data[..], b"hello");

        // writing the same content again is a no-op
        let again = store
            .write_object(&GitObject::new(Fmt::Blob, &b"hello"[..]))
            .unwrap();
        assert_eq!(again, sha);
    }

    #[test]
    fn read_missing_object_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path());

        assert!(store.read_object(&"1".repeat(40)).is_err());
        assert!(store.read_object("short").is_err());
    }
}
