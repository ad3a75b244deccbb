//! Refs are text files containing the hexadecimal id of a commit, encoded in ASCII.
//!
//! Refs can also refer to another reference (`ref: refs/heads/main`), and thus
//! only indirectly to a commit. Only the upper-case pseudo refs at the root of
//! the repository directory, `HEAD` in practice, may be symbolic.
//!
//! Every call goes to disk; nothing is cached between calls.

pub mod resolver;
pub mod tag;

use crate::error::RefError;
use crate::objects::CommitId;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The well-known symbolic ref naming the current branch.
pub const HEAD: &str = "HEAD";

const SYMBOLIC_PREFIX: &str = "ref: ";

/// Disjoint key spaces of the ref store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Pseudo refs stored at the root of the repository directory.
    Symbolic,
    /// Branches, `refs/heads/`.
    Heads,
    /// Tags, `refs/tags/`.
    Tags,
}

impl Namespace {
    /// The directory of this namespace, relative to the repository directory.
    pub fn relative_dir(&self) -> &'static str {
        match self {
            Namespace::Symbolic => "",
            Namespace::Heads => "refs/heads",
            Namespace::Tags => "refs/tags",
        }
    }

    /// The fully qualified name of `name` in this namespace, e.g. `refs/tags/v1.0.0`.
    pub fn qualify(&self, name: &str) -> String {
        match self {
            Namespace::Symbolic => name.to_string(),
            _ => format!("{}/{}", self.relative_dir(), name),
        }
    }
}

/// Checks that `name` can be used as a single path component inside a namespace.
pub fn validate_ref_name(namespace: Namespace, name: &str) -> Result<(), RefError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains(['/', '\\', '\0']) {
        Some("must not contain path separators")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("must not contain whitespace or control characters")
    } else if name.contains("..") {
        Some("must not contain '..'")
    } else if name.starts_with('.') {
        Some("must not start with '.'")
    } else if name.ends_with(".lock") {
        Some("must not end with '.lock'")
    } else if namespace == Namespace::Symbolic
        && !name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
    {
        Some("symbolic refs use upper-case letters and '_' only")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RefError::InvalidRefName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// The decoded content of a ref file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefValue {
    /// Points straight at a commit.
    Direct(CommitId),
    /// Names another ref, e.g. `refs/heads/main`.
    Symbolic(String),
}

impl RefValue {
    /// Decodes a stored value; anything that is neither `ref: <name>` nor a
    /// commit id is reported as an invalid reference to `name`.
    pub fn parse(name: &str, value: &str) -> Result<RefValue, RefError> {
        if let Some(target) = value.strip_prefix(SYMBOLIC_PREFIX) {
            return Ok(RefValue::Symbolic(target.trim().to_string()));
        }

        value
            .parse::<CommitId>()
            .map(RefValue::Direct)
            .map_err(|_| RefError::invalid_reference(name))
    }

    pub fn encode(&self) -> String {
        match self {
            RefValue::Direct(id) => id.to_string(),
            RefValue::Symbolic(target) => format!("{}{}", SYMBOLIC_PREFIX, target),
        }
    }
}

/// A parsed ref expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefExpr<'a> {
    /// The literal `HEAD`.
    Head,
    /// `[refs/]heads/<name>` or `[refs/]tags/<name>`.
    Named { namespace: Namespace, name: &'a str },
    /// A raw commit id.
    Commit(CommitId),
}

impl<'a> RefExpr<'a> {
    /// Parses `expr` against the accepted grammar. There is no lookup across
    /// namespaces: `v1.0.0` alone is malformed, `tags/v1.0.0` is not.
    pub fn parse(expr: &'a str) -> Result<RefExpr<'a>, RefError> {
        if expr == HEAD {
            return Ok(RefExpr::Head);
        }

        let qualified = expr.strip_prefix("refs/").unwrap_or(expr);
        let named = [Namespace::Heads, Namespace::Tags]
            .into_iter()
            .find_map(|namespace| {
                let kind = namespace.relative_dir().trim_start_matches("refs/");
                qualified
                    .strip_prefix(kind)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|name| (namespace, name))
            });

        if let Some((namespace, name)) = named {
            return match validate_ref_name(namespace, name) {
                Ok(()) => Ok(RefExpr::Named { namespace, name }),
                Err(_) => Err(RefError::invalid_reference(expr)),
            };
        }

        expr.parse::<CommitId>()
            .map(RefExpr::Commit)
            .map_err(|_| RefError::invalid_reference(expr))
    }
}

/// Durable name → value storage, one file per entry.
#[derive(Debug, Clone)]
pub struct RefStore {
    repo_dir: PathBuf,
}

impl RefStore {
    /// A store rooted at a repository directory (`<work tree>/.caf`). The
    /// directory does not need to exist for reads.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        self.repo_dir.join(namespace.relative_dir())
    }

    fn entry_path(&self, namespace: Namespace, name: &str) -> Result<PathBuf, RefError> {
        validate_ref_name(namespace, name)?;
        Ok(self.namespace_dir(namespace).join(name))
    }

    /// Writes `value` for `name`, replacing any previous value. The data is
    /// flushed to disk before this returns.
    pub fn put(&self, namespace: Namespace, name: &str, value: &str) -> Result<(), RefError> {
        let path = self.entry_path(namespace, name)?;

        fs::create_dir_all(self.namespace_dir(namespace))?;

        let mut file = fs::File::create(&path)?;
        file.write_all(value.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        debug!(ref_name = %namespace.qualify(name), %value, "wrote ref");
        Ok(())
    }

    /// Reads the value stored for `name`, `None` when there is no such entry.
    pub fn get(&self, namespace: Namespace, name: &str) -> Result<Option<String>, RefError> {
        let path = self.entry_path(namespace, name)?;

        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data.trim_end_matches(['\n', '\r']).to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // a directory squatting on the name is not a ref either
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes `name`; returns whether it existed.
    pub fn delete(&self, namespace: Namespace, name: &str) -> Result<bool, RefError> {
        let path = self.entry_path(namespace, name)?;

        if !path.is_file() {
            return Ok(false);
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(ref_name = %namespace.qualify(name), "deleted ref");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all entries in `namespace`, sorted. A namespace that was never
    /// written to is empty.
    pub fn list(&self, namespace: Namespace) -> Result<Vec<String>, RefError> {
        let dir = self.namespace_dir(namespace);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // skip anything that could not have been written through `put`
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if validate_ref_name(namespace, &name).is_ok() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Reads and decodes an entry.
    pub fn read_value(
        &self,
        namespace: Namespace,
        name: &str,
    ) -> Result<Option<RefValue>, RefError> {
        self.get(namespace, name)?
            .map(|value| RefValue::parse(&namespace.qualify(name), &value))
            .transpose()
    }

    pub fn write_value(
        &self,
        namespace: Namespace,
        name: &str,
        value: &RefValue,
    ) -> Result<(), RefError> {
        self.put(namespace, name, &value.encode())
    }
}
