//! Lightweight tags: immutable names for commits, stored under `refs/tags/`.
//!
//! A tag is written once by [`TagManager::create_tag`] and only goes away
//! through [`TagManager::delete_tag`]. Moving a tag means deleting and
//! creating it again.

use crate::error::{RefError, TagError};
use crate::objects::{CommitId, ObjectStore};
use crate::refs::resolver::RefResolver;
use crate::refs::{validate_ref_name, Namespace, RefStore, RefValue};
use std::fmt;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub target: CommitId,
}

impl Tag {
    pub fn new(name: impl Into<String>, target: CommitId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// `refs/tags/<name>`
    pub fn reference_name(&self) -> String {
        Namespace::Tags.qualify(&self.name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.name, self.target)
    }
}

/// The only writer of the tag namespace.
pub struct TagManager<O> {
    refs: RefStore,
    objects: O,
}

impl<O: ObjectStore> TagManager<O> {
    pub fn new(refs: RefStore, objects: O) -> Self {
        Self { refs, objects }
    }

    /// Tags the commit `ref_expression` resolves to.
    ///
    /// Resolution failures come back as [`TagError::Ref`] carrying the
    /// resolver's own error.
    pub fn create_tag(&self, name: &str, ref_expression: &str) -> Result<Tag, TagError> {
        validate_tag_name(name)?;

        // an existing tag wins over whatever the expression would resolve to
        if self.refs.get(Namespace::Tags, name)?.is_some() {
            return Err(TagError::TagAlreadyExists {
                name: name.to_string(),
            });
        }

        let target = RefResolver::new(&self.refs, &self.objects).resolve(ref_expression)?;

        self.refs
            .write_value(Namespace::Tags, name, &RefValue::Direct(target.clone()))?;

        info!(tag = name, %target, "created tag");
        Ok(Tag::new(name, target))
    }

    pub fn delete_tag(&self, name: &str) -> Result<(), TagError> {
        let not_found = || TagError::TagNotFound {
            name: name.to_string(),
        };

        // a name that could never have been stored is simply not there
        if validate_ref_name(Namespace::Tags, name).is_err() {
            return Err(not_found());
        }

        if !self.refs.delete(Namespace::Tags, name)? {
            return Err(not_found());
        }

        info!(tag = name, "deleted tag");
        Ok(())
    }

    pub fn get_tag(&self, name: &str) -> Result<Option<Tag>, TagError> {
        if validate_ref_name(Namespace::Tags, name).is_err() {
            return Ok(None);
        }

        self.refs
            .read_value(Namespace::Tags, name)?
            .map(|value| tag_from_value(name, value))
            .transpose()
    }

    /// All tags sorted by name. Works, and is empty, on a directory that is
    /// not a repository.
    pub fn list_tags(&self) -> Result<Vec<Tag>, TagError> {
        self.refs
            .list(Namespace::Tags)?
            .into_iter()
            .filter_map(|name| match self.refs.read_value(Namespace::Tags, &name) {
                Ok(Some(value)) => Some(tag_from_value(&name, value)),
                // deleted between listing and reading
                Ok(None) => None,
                Err(e) => Some(Err(e.into())),
            })
            .collect()
    }
}

fn tag_from_value(name: &str, value: RefValue) -> Result<Tag, TagError> {
    match value {
        RefValue::Direct(target) => Ok(Tag::new(name, target)),
        RefValue::Symbolic(_) => {
            Err(RefError::invalid_reference(Namespace::Tags.qualify(name)).into())
        }
    }
}

/// Tag names follow the ref name rules of the tag namespace.
pub fn validate_tag_name(name: &str) -> Result<(), TagError> {
    validate_ref_name(Namespace::Tags, name).map_err(|e| match e {
        RefError::InvalidRefName { name, reason } => {
            TagError::InvalidTagName { name, reason }
        }
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeObjects(HashSet<CommitId>);

    impl ObjectStore for FakeObjects {
        fn exists(&self, id: &CommitId) -> bool {
            self.0.contains(id)
        }
    }

    fn id(c: char) -> CommitId {
        c.to_string().repeat(40).parse().unwrap()
    }

    /// A repo-like layout with HEAD on `main` at `c1`, plus `c2` in the store.
    fn setup() -> (tempfile::TempDir, TagManager<FakeObjects>) {
        let dir = tempfile::tempdir().unwrap();
        let refs = RefStore::new(dir.path());
        refs.put(Namespace::Symbolic, "HEAD", "ref: refs/heads/main")
            .unwrap();
        refs.put(Namespace::Heads, "main", id('1').as_str()).unwrap();

        let objects = FakeObjects([id('1'), id('2')].into_iter().collect());
        (dir, TagManager::new(refs, objects))
    }

    #[test]
    fn create_from_head_and_list() {
        let (_dir, tags) = setup();

        let tag = tags.create_tag("v1.0.0", "HEAD").unwrap();
        assert_eq!(tag, Tag::new("v1.0.0", id('1')));
        assert_eq!(tag.reference_name(), "refs/tags/v1.0.0");

        assert_eq!(tags.list_tags().unwrap(), [tag.clone()]);
        assert_eq!(tags.get_tag("v1.0.0").unwrap(), Some(tag));
    }

    #[test]
    fn duplicate_create_fails_regardless_of_target() {
        let (_dir, tags) = setup();

        tags.create_tag("v1.0.0", "HEAD").unwrap();

        assert!(matches!(
            tags.create_tag("v1.0.0", id('1').as_str()),
            Err(TagError::TagAlreadyExists { name }) if name == "v1.0.0"
        ));
        assert!(matches!(
            tags.create_tag("v1.0.0", id('2').as_str()),
            Err(TagError::TagAlreadyExists { .. })
        ));
        // the first target is untouched
        assert_eq!(tags.get_tag("v1.0.0").unwrap().unwrap().target, id('1'));
    }

    #[test]
    fn duplicate_is_reported_before_the_expression_is_resolved() {
        let (_dir, tags) = setup();

        tags.create_tag("v1.0.0", "HEAD").unwrap();

        let unknown_commit = "7".repeat(40);
        for expression in ["bogus", "tags/missing", unknown_commit.as_str()] {
            assert!(
                matches!(
                    tags.create_tag("v1.0.0", expression),
                    Err(TagError::TagAlreadyExists { .. })
                ),
                "{expression:?}"
            );
        }
    }

    #[test]
    fn invalid_names_are_rejected_before_resolution() {
        let (_dir, tags) = setup();

        for name in ["", "a/b", "../x", ".hidden", "v1.lock", "with space"] {
            assert!(
                matches!(
                    tags.create_tag(name, "not a ref"),
                    Err(TagError::InvalidTagName { .. })
                ),
                "{name:?}"
            );
        }
    }

    #[test]
    fn resolution_errors_propagate_unchanged() {
        let (_dir, tags) = setup();

        let err = tags.create_tag("v1.0.0", "invalid_ref_12345").unwrap_err();
        assert!(matches!(
            err,
            TagError::Ref(RefError::InvalidReference { ref expression }) if expression == "invalid_ref_12345"
        ));
        assert!(err.to_string().starts_with("Invalid reference"));

        assert!(matches!(
            tags.create_tag("v1.0.0", id('7').as_str()),
            Err(TagError::Ref(RefError::InvalidReference { .. }))
        ));
        assert!(tags.list_tags().unwrap().is_empty());
    }

    #[test]
    fn tags_can_point_at_tags() {
        let (_dir, tags) = setup();

        tags.create_tag("v1.0.0", id('2').as_str()).unwrap();
        let alias = tags.create_tag("stable", "tags/v1.0.0").unwrap();

        assert_eq!(alias.target, id('2'));
    }

    #[test]
    fn delete_then_delete_again() {
        let (_dir, tags) = setup();

        tags.create_tag("v1.0.0", "HEAD").unwrap();
        tags.delete_tag("v1.0.0").unwrap();

        assert!(matches!(
            tags.delete_tag("v1.0.0"),
            Err(TagError::TagNotFound { name }) if name == "v1.0.0"
        ));
        assert!(tags.list_tags().unwrap().is_empty());
        assert!(matches!(
            tags.delete_tag("../HEAD"),
            Err(TagError::TagNotFound { .. })
        ));
    }

    #[test]
    fn delete_one_of_three() {
        let (_dir, tags) = setup();

        tags.create_tag("v1.0.0", id('1').as_str()).unwrap();
        tags.create_tag("v1.1.0", id('1').as_str()).unwrap();
        tags.create_tag("v2.0.0", id('2').as_str()).unwrap();

        tags.delete_tag("v1.1.0").unwrap();

        assert_eq!(
            tags.list_tags().unwrap(),
            [Tag::new("v1.0.0", id('1')), Tag::new("v2.0.0", id('2'))]
        );
    }

    #[test]
    fn list_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tags = TagManager::new(
            RefStore::new(dir.path().join("nowhere/.caf")),
            FakeObjects::default(),
        );

        assert!(tags.list_tags().unwrap().is_empty());
        assert_eq!(tags.get_tag("v1").unwrap(), None);
    }

    #[test]
    fn create_and_recreate_moves_a_tag() {
        let (_dir, tags) = setup();

        tags.create_tag("latest", id('1').as_str()).unwrap();
        tags.delete_tag("latest").unwrap();
        let moved = tags.create_tag("latest", id('2').as_str()).unwrap();

        assert_eq!(moved.target, id('2'));
    }
}
