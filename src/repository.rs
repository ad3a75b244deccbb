use crate::error::{RefError, RepositoryError, TagError};
use crate::objects::commit::Commit;
use crate::objects::{CommitId, Fmt, GitObject, GitObjectTrait, LooseObjectStore};
use crate::refs::resolver::RefResolver;
use crate::refs::tag::{Tag, TagManager};
use crate::refs::{Namespace, RefExpr, RefStore, RefValue, HEAD};
use indexmap::IndexMap;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the repository directory inside a work tree.
pub const REPO_DIR: &str = ".caf";

pub const DEFAULT_BRANCH: &str = "main";

/// The repository directory belonging to `work_tree`, whether or not it exists.
pub fn repo_dir(work_tree: impl AsRef<Path>) -> PathBuf {
    work_tree.as_ref().join(REPO_DIR)
}

/// a caf repository
///
/// The handle is passed explicitly to everything that needs a repository;
/// nothing here depends on the process working directory.
#[derive(Debug)]
pub struct Repository {
    pub work_tree: PathBuf,
    pub repo_dir: PathBuf,
    pub config: RepoConfig,
}

#[derive(Debug)]
pub struct RepoConfig(configparser::ini::Ini);

impl RepoConfig {
    /// `Name <email>` from the `user` section, if both are set.
    pub fn user(&self) -> Option<String> {
        let name = self.get("user", "name")?;
        let email = self.get("user", "email")?;

        Some(format!("{} <{}>", name, email))
    }

    pub fn default_branch(&self) -> String {
        self.get("init", "defaultbranch")
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.0.setstr(section, key, Some(value));
    }
}

impl Deref for RepoConfig {
    type Target = configparser::ini::Ini;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        let mut config = configparser::ini::Ini::new();

        config.setstr("core", "repositoryformatversion", Some("0"));
        config.setstr("core", "bare", Some("false"));
        config.setstr("init", "defaultbranch", Some(DEFAULT_BRANCH));

        Self(config)
    }
}

impl Repository {
    /// Load the repository of `work_tree`.
    pub fn load(work_tree: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let work_tree = work_tree.into();
        let repo_dir = repo_dir(&work_tree);

        if !repo_dir.is_dir() {
            return Err(RepositoryError::NotInitialized { path: work_tree });
        }

        let mut config = configparser::ini::Ini::new();
        let config_path = repo_dir.join("config");
        if config_path.is_file() {
            config.load(&config_path).map_err(RepositoryError::Config)?;
        }

        Ok(Self {
            work_tree,
            repo_dir,
            config: RepoConfig(config),
        })
    }

    /// Create a new repository in `work_tree`, with HEAD on the default branch.
    pub fn init(work_tree: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        Self::init_with_config(work_tree, RepoConfig::default())
    }

    pub fn init_with_config(
        work_tree: impl Into<PathBuf>,
        config: RepoConfig,
    ) -> Result<Self, RepositoryError> {
        let work_tree = work_tree.into();
        let repo_dir = repo_dir(&work_tree);

        if repo_dir.exists() {
            return Err(RepositoryError::AlreadyInitialized { path: work_tree });
        }

        fs::create_dir_all(repo_dir.join("objects"))?;
        fs::create_dir_all(repo_dir.join(Namespace::Heads.relative_dir()))?;
        fs::create_dir_all(repo_dir.join(Namespace::Tags.relative_dir()))?;

        config.write(repo_dir.join("config"))?;

        let repo = Self {
            work_tree,
            repo_dir,
            config,
        };

        let branch = Namespace::Heads.qualify(&repo.config.default_branch());
        repo.refs()
            .write_value(Namespace::Symbolic, HEAD, &RefValue::Symbolic(branch))?;

        info!(path = %repo.repo_dir.display(), "initialized repository");
        Ok(repo)
    }

    pub fn refs(&self) -> RefStore {
        RefStore::new(&self.repo_dir)
    }

    pub fn objects(&self) -> LooseObjectStore {
        LooseObjectStore::new(self.repo_dir.join("objects"))
    }

    pub fn tag_manager(&self) -> TagManager<LooseObjectStore> {
        TagManager::new(self.refs(), self.objects())
    }

    /// Resolve a ref expression to a commit id.
    pub fn resolve(&self, expr: &str) -> Result<CommitId, RefError> {
        let refs = self.refs();
        let objects = self.objects();
        RefResolver::new(&refs, &objects).resolve(expr)
    }

    pub fn create_tag(&self, name: &str, ref_expression: &str) -> Result<Tag, TagError> {
        self.tag_manager().create_tag(name, ref_expression)
    }

    pub fn delete_tag(&self, name: &str) -> Result<(), TagError> {
        self.tag_manager().delete_tag(name)
    }

    pub fn tags(&self) -> Result<Vec<Tag>, TagError> {
        self.tag_manager().list_tags()
    }

    /// The branch HEAD is attached to, `None` when detached.
    pub fn active_branch(&self) -> Result<Option<String>, RefError> {
        match self.refs().read_value(Namespace::Symbolic, HEAD)? {
            Some(RefValue::Symbolic(target)) => {
                let branch = match RefExpr::parse(&target) {
                    Ok(RefExpr::Named {
                        namespace: Namespace::Heads,
                        name,
                    }) => Some(name.to_string()),
                    _ => None,
                };

                match branch {
                    Some(branch) => Ok(Some(branch)),
                    None => Err(RefError::UnresolvedSymbolicRef {
                        name: HEAD.to_string(),
                        target: Some(target),
                    }),
                }
            }
            Some(RefValue::Direct(_)) => Ok(None),
            None => Err(RefError::UnresolvedSymbolicRef {
                name: HEAD.to_string(),
                target: None,
            }),
        }
    }

    /// The commit HEAD currently points at; `None` before the first commit.
    pub fn head_commit(&self) -> Result<Option<CommitId>, RefError> {
        match self.resolve(HEAD) {
            Ok(id) => Ok(Some(id)),
            Err(RefError::UnresolvedSymbolicRef { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Record a commit on top of HEAD and move the active branch (or a
    /// detached HEAD) to it.
    ///
    /// Only history is recorded; snapshotting the work tree belongs to the
    /// staging layer.
    pub fn commit(&self, author: &str, message: &str) -> Result<CommitId, RepositoryError> {
        let parent = self.head_commit()?;

        let commit = Commit::new(parent.as_ref(), author, chrono::Local::now(), message);
        let data = commit.serialize().map_err(RepositoryError::Object)?;

        let sha = self
            .objects()
            .write_object(&GitObject::new(Fmt::Commit, data))
            .map_err(RepositoryError::Object)?;
        let id: CommitId = sha
            .parse()
            .map_err(|e| RepositoryError::Object(anyhow::Error::new(e)))?;

        // Update HEAD so our commit is now the tip of the active branch.
        let refs = self.refs();
        let value = RefValue::Direct(id.clone());
        match self.active_branch()? {
            Some(branch) => refs.write_value(Namespace::Heads, &branch, &value)?,
            None => refs.write_value(Namespace::Symbolic, HEAD, &value)?,
        }

        info!(commit = %id, "recorded commit");
        Ok(id)
    }

    pub fn read_commit(&self, id: &CommitId) -> Result<Commit, RepositoryError> {
        let object = self
            .objects()
            .read_object(id.as_str())
            .map_err(RepositoryError::Object)?;

        if object.fmt != Fmt::Commit {
            return Err(RepositoryError::Object(anyhow::anyhow!(
                "{} is a {}, not a commit",
                id,
                object.fmt.to_str()
            )));
        }

        Commit::from_bytes(object.data).map_err(RepositoryError::Object)
    }

    /// Every ref that currently resolves, keyed by its path relative to the
    /// repository directory (`HEAD`, `refs/heads/main`, `refs/tags/v1.0.0`).
    ///
    /// Refs that do not resolve, such as HEAD before the first commit, are
    /// left out.
    pub fn show_refs(&self) -> Result<IndexMap<String, CommitId>, RepositoryError> {
        let mut dict = IndexMap::new();

        match self.resolve(HEAD) {
            Ok(head) => {
                dict.insert(HEAD.to_string(), head);
            }
            Err(RefError::UnresolvedSymbolicRef { .. } | RefError::InvalidReference { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let refs_path = self.repo_dir.join("refs");
        if !refs_path.is_dir() {
            return Ok(dict);
        }

        let walker = walkdir::WalkDir::new(&refs_path)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = entry.map_err(|e| RepositoryError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.repo_dir) else {
                continue;
            };
            let Some(name) = relative.to_str() else {
                continue;
            };
            let name = name.replace(std::path::MAIN_SEPARATOR, "/");

            match self.resolve(&name) {
                Ok(id) => {
                    dict.insert(name, id);
                }
                Err(RefError::InvalidReference { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(dict)
    }
}
