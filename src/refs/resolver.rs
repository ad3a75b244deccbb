use crate::error::RefError;
use crate::objects::{CommitId, ObjectStore};
use crate::refs::{Namespace, RefExpr, RefStore, RefValue, HEAD};
use tracing::trace;

/// Turns ref expressions into commit ids.
///
/// Accepted expressions are `HEAD`, a qualified ref name (`tags/v1.0.0`,
/// `refs/heads/main`) or a full commit id. `HEAD` may name another ref; that
/// indirection is followed exactly once. Whatever the expression, the final
/// commit must exist in the object store.
pub struct RefResolver<'a, O> {
    refs: &'a RefStore,
    objects: &'a O,
}

impl<'a, O: ObjectStore> RefResolver<'a, O> {
    pub fn new(refs: &'a RefStore, objects: &'a O) -> Self {
        Self { refs, objects }
    }

    pub fn resolve(&self, expr: &str) -> Result<CommitId, RefError> {
        let candidate = match RefExpr::parse(expr)? {
            RefExpr::Head => self.follow_head()?,
            RefExpr::Named { namespace, name } => self
                .read_direct(namespace, name)?
                .ok_or_else(|| RefError::invalid_reference(expr))?,
            RefExpr::Commit(id) => id,
        };

        if !self.objects.exists(&candidate) {
            return Err(RefError::invalid_reference(expr));
        }

        trace!(%expr, commit = %candidate, "resolved ref");
        Ok(candidate)
    }

    fn follow_head(&self) -> Result<CommitId, RefError> {
        let value = self
            .refs
            .read_value(Namespace::Symbolic, HEAD)?
            .ok_or_else(|| RefError::UnresolvedSymbolicRef {
                name: HEAD.to_string(),
                target: None,
            })?;

        let target = match value {
            RefValue::Direct(id) => return Ok(id),
            RefValue::Symbolic(target) => target,
        };

        let unresolved = || RefError::UnresolvedSymbolicRef {
            name: HEAD.to_string(),
            target: Some(target.clone()),
        };

        match RefExpr::parse(&target).map_err(|_| unresolved())? {
            RefExpr::Named { namespace, name } => {
                self.read_direct(namespace, name)?.ok_or_else(unresolved)
            }
            RefExpr::Commit(id) => Ok(id),
            // one level of indirection only
            RefExpr::Head => Err(unresolved()),
        }
    }

    /// Reads a ref that must hold a commit id.
    fn read_direct(&self, namespace: Namespace, name: &str) -> Result<Option<CommitId>, RefError> {
        match self.refs.read_value(namespace, name)? {
            Some(RefValue::Direct(id)) => Ok(Some(id)),
            Some(RefValue::Symbolic(_)) => {
                Err(RefError::invalid_reference(namespace.qualify(name)))
            }
            None => Ok(None),
        }
    }
}
