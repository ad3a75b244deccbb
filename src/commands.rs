//! The command layer: one function per CLI command.
//!
//! Each command takes the working directory explicitly, writes its report to
//! the given `out`/`err` writers and returns the process exit code.
//! Anticipated failures (missing arguments, duplicate or unknown tags, no
//! repository) are rendered on `err` and turn into [`EXIT_FAILURE`]. A ref
//! expression that does not resolve is not rendered: it comes back as
//! [`CommandError::Ref`] for the caller to deal with.

use crate::error::{RefError, RepositoryError, TagError};
use crate::objects::LooseObjectStore;
use crate::refs::tag::TagManager;
use crate::refs::RefStore;
use crate::repository::{repo_dir, Repository};
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = -1;

#[derive(Debug, Error)]
pub enum CommandError {
    /// A ref expression did not resolve.
    #[error(transparent)]
    Ref(#[from] RefError),

    /// Writing the report failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// A required command field that was not supplied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Tag name is required")]
    MissingTagName,
    #[error("A ref is required")]
    MissingRef,
    #[error("A commit message is required")]
    MissingMessage,
    #[error("An author is required: pass --author or set user.name and user.email")]
    MissingAuthor,
}

fn required<T>(value: Option<T>, missing: ArgumentError) -> Result<T, ArgumentError> {
    value.ok_or(missing)
}

#[derive(Args, Debug, Default, Clone)]
pub struct InitArgs {
    /// Directory to create the repository in, relative to the working directory
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CommitArgs {
    /// Commit message (required)
    #[arg(short, long)]
    pub message: Option<String>,
    /// `Name <email>`; defaults to user.name and user.email from the repository config
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CreateTagArgs {
    /// Name of the new tag (required)
    #[arg(value_name = "TAG_NAME")]
    pub name: Option<String>,
    /// HEAD, a ref such as heads/main or tags/v1.0.0, or a commit id (required)
    #[arg(value_name = "REF")]
    pub reference: Option<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct DeleteTagArgs {
    /// Name of the tag to delete (required)
    #[arg(value_name = "TAG_NAME")]
    pub name: Option<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ResolveArgs {
    /// Ref expression to resolve (required)
    #[arg(value_name = "REF")]
    pub reference: Option<String>,
}

pub struct ValidCreateTag {
    pub name: String,
    pub reference: String,
}

impl CreateTagArgs {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            reference: Some(reference.into()),
        }
    }

    pub fn validate(self) -> Result<ValidCreateTag, ArgumentError> {
        Ok(ValidCreateTag {
            name: required(self.name, ArgumentError::MissingTagName)?,
            reference: required(self.reference, ArgumentError::MissingRef)?,
        })
    }
}

impl DeleteTagArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn validate(self) -> Result<String, ArgumentError> {
        required(self.name, ArgumentError::MissingTagName)
    }
}

impl ResolveArgs {
    pub fn validate(self) -> Result<String, ArgumentError> {
        required(self.reference, ArgumentError::MissingRef)
    }
}

impl CommitArgs {
    pub fn validate(self) -> Result<(Option<String>, String), ArgumentError> {
        let message = required(self.message, ArgumentError::MissingMessage)?;
        Ok((self.author, message))
    }
}

/// Renders an anticipated failure and yields the failure exit code.
fn fail(err: &mut impl Write, error: impl std::fmt::Display) -> Result<i32, CommandError> {
    writeln!(err, "{}", error)?;
    Ok(EXIT_FAILURE)
}

fn load(working_dir: &Path, err: &mut impl Write) -> Result<Result<Repository, i32>, CommandError> {
    match Repository::load(working_dir) {
        Ok(repo) => Ok(Ok(repo)),
        Err(e) => fail(err, e).map(Err),
    }
}

pub fn init(
    working_dir: &Path,
    args: InitArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let target = working_dir.join(args.path);

    match Repository::init(&target) {
        Ok(repo) => {
            writeln!(
                out,
                "Initialized empty caf repository in {}",
                repo.repo_dir.display()
            )?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => fail(err, e),
    }
}

pub fn commit(
    working_dir: &Path,
    args: CommitArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let (author, message) = match args.validate() {
        Ok(valid) => valid,
        Err(e) => return fail(err, e),
    };

    let repo = match load(working_dir, err)? {
        Ok(repo) => repo,
        Err(code) => return Ok(code),
    };

    let Some(author) = author.or_else(|| repo.config.user()) else {
        return fail(err, ArgumentError::MissingAuthor);
    };

    match repo.commit(&author, &message) {
        Ok(id) => {
            let branch = repo
                .active_branch()?
                .unwrap_or_else(|| "detached HEAD".to_string());
            writeln!(out, "[{} {}] {}", branch, id, message)?;
            Ok(EXIT_SUCCESS)
        }
        Err(RepositoryError::Ref(e)) => Err(e.into()),
        Err(e) => fail(err, e),
    }
}

pub fn create_tag(
    working_dir: &Path,
    args: CreateTagArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let ValidCreateTag { name, reference } = match args.validate() {
        Ok(valid) => valid,
        Err(e) => return fail(err, e),
    };

    let repo = match load(working_dir, err)? {
        Ok(repo) => repo,
        Err(code) => return Ok(code),
    };

    match repo.create_tag(&name, &reference) {
        Ok(tag) => {
            writeln!(out, "Tag \"{}\" created for commit {}", tag.name, tag.target)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            // resolution failures keep propagating
            let e = e.into_user_error()?;
            fail(err, e)
        }
    }
}

pub fn delete_tag(
    working_dir: &Path,
    args: DeleteTagArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let name = match args.validate() {
        Ok(name) => name,
        Err(e) => return fail(err, e),
    };

    // delete reports a missing repository with its own wording
    let repo = match Repository::load(working_dir) {
        Ok(repo) => repo,
        Err(RepositoryError::NotInitialized { path }) => {
            return fail(
                err,
                format_args!("Repository error: repository {} does not exist", path.display()),
            )
        }
        Err(e) => return fail(err, e),
    };

    match repo.delete_tag(&name) {
        Ok(()) => {
            writeln!(out, "Tag \"{}\" deleted successfully", name)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e @ TagError::Ref(_)) => fail(err, format_args!("Repository error: {}", e)),
        Err(e) => fail(err, e),
    }
}

/// Lists tags. A directory without a repository simply has no tags.
pub fn tags(
    working_dir: &Path,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let repo_dir = repo_dir(working_dir);
    let manager = TagManager::new(
        RefStore::new(&repo_dir),
        LooseObjectStore::new(repo_dir.join("objects")),
    );

    let tags = match manager.list_tags() {
        Ok(tags) => tags,
        Err(e) => return fail(err, format_args!("Repository error: {}", e)),
    };

    if tags.is_empty() {
        writeln!(out, "No tags found")?;
        return Ok(EXIT_SUCCESS);
    }

    writeln!(out, "Tags:")?;
    for tag in tags {
        writeln!(out, "  {}", tag)?;
    }
    Ok(EXIT_SUCCESS)
}

pub fn resolve(
    working_dir: &Path,
    args: ResolveArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let reference = match args.validate() {
        Ok(reference) => reference,
        Err(e) => return fail(err, e),
    };

    let repo = match load(working_dir, err)? {
        Ok(repo) => repo,
        Err(code) => return Ok(code),
    };

    let id = repo.resolve(&reference)?;
    writeln!(out, "{}", id)?;
    Ok(EXIT_SUCCESS)
}

pub fn show_ref(
    working_dir: &Path,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<i32, CommandError> {
    let repo = match load(working_dir, err)? {
        Ok(repo) => repo,
        Err(code) => return Ok(code),
    };

    let refs = match repo.show_refs() {
        Ok(refs) => refs,
        Err(RepositoryError::Ref(e)) => return Err(e.into()),
        Err(e) => return fail(err, e),
    };

    for (name, id) in refs {
        writeln!(out, "{} {}", id, name)?;
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_tag_args_validation_reports_first_missing_field() {
        assert_eq!(
            CreateTagArgs::default().validate().err(),
            Some(ArgumentError::MissingTagName)
        );
        assert_eq!(
            CreateTagArgs {
                name: Some("v1".into()),
                reference: None
            }
            .validate()
            .err(),
            Some(ArgumentError::MissingRef)
        );

        let valid = CreateTagArgs::new("v1", "HEAD").validate().unwrap();
        assert_eq!(valid.name, "v1");
        assert_eq!(valid.reference, "HEAD");
    }

    #[test]
    fn missing_fields_render_messages() {
        let dir = tempfile::tempdir().unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = create_tag(
            dir.path(),
            CreateTagArgs {
                name: None,
                reference: Some("HEAD".into()),
            },
            &mut out,
            &mut err,
        )
        .unwrap();
        assert_eq!(code, EXIT_FAILURE);
        assert!(String::from_utf8(err).unwrap().contains("Tag name is required"));

        let mut err = Vec::new();
        let code = delete_tag(dir.path(), DeleteTagArgs::default(), &mut out, &mut err).unwrap();
        assert_eq!(code, EXIT_FAILURE);
        assert!(String::from_utf8(err).unwrap().contains("Tag name is required"));

        let mut err = Vec::new();
        let code = commit(dir.path(), CommitArgs::default(), &mut out, &mut err).unwrap();
        assert_eq!(code, EXIT_FAILURE);
        assert!(String::from_utf8(err).unwrap().contains("message is required"));

        assert!(out.is_empty());
    }

    #[test]
    fn commit_requires_an_author() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let args = CommitArgs {
            message: Some("first".into()),
            author: None,
        };
        assert_eq!(
            commit(dir.path(), args, &mut out, &mut err).unwrap(),
            EXIT_FAILURE
        );
        assert!(String::from_utf8(err).unwrap().contains("author is required"));
    }
}
