use crate::objects::kvlm::Kvlm;
use crate::objects::{CommitId, GitObjectTrait};
use bytes::Bytes;
use chrono::{DateTime, Offset, TimeZone};

/// A commit object. It records:
///
/// Zero or more parents;
///
/// An author identity (name and email) with a timestamp;
///
/// A committer identity with a timestamp;
///
/// A message.
///
/// There is no tree: the working tree snapshot is owned by the staging layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    kvlm: Kvlm,
}

impl Commit {
    impl_kvlm_getter_single! {
        author,
        committer
    }

    pub fn new<Tz: TimeZone>(
        parent: Option<&CommitId>,
        author: &str,
        time: DateTime<Tz>,
        message: &str,
    ) -> Self {
        let mut kvlm = Kvlm::default();

        if let Some(parent) = parent {
            kvlm.push("parent", parent.as_str());
        }

        let offset = time.offset().fix().local_minus_utc();
        let sign = if offset < 0 { '-' } else { '+' };
        let offset = offset.abs();
        let tz = format!("{}{:02}{:02}", sign, offset / 3600, (offset % 3600) / 60);
        let stamp = format!("{} {} {}", author, time.timestamp(), tz);

        kvlm.push("author", stamp.clone());
        kvlm.push("committer", stamp);
        kvlm.set_message(message);

        Self { kvlm }
    }

    pub fn parents(&self) -> &[String] {
        self.kvlm.get("parent")
    }

    pub fn message(&self) -> &str {
        self.kvlm.message()
    }
}

impl GitObjectTrait for Commit {
    fn from_bytes(data: Bytes) -> anyhow::Result<Self> {
        let kvlm = Kvlm::parse(&data)?;

        anyhow::ensure!(kvlm.get_single("author").is_some(), "missing field author");
        anyhow::ensure!(
            kvlm.get_single("committer").is_some(),
            "missing field committer"
        );

        Ok(Self { kvlm })
    }

    fn serialize(&self) -> anyhow::Result<Bytes> {
        Ok(self.kvlm.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn new_commit_formats_identity_and_timezone() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let time = tz.timestamp_opt(1703757808, 0).unwrap();
        let parent: CommitId = "409f2bf19becc055a2bfb188bcced9d001842b23".parse().unwrap();

        let commit = Commit::new(Some(&parent), "Ada <ada@example.com>", time, "second");

        assert_eq!(
            commit.author().unwrap(),
            "Ada <ada@example.com> 1703757808 +0800"
        );
        assert_eq!(commit.parents(), [parent.to_string()]);
        assert_eq!(commit.message(), "second");
    }

    #[test]
    fn negative_offsets_keep_minutes_positive() {
        let tz = FixedOffset::west_opt(3 * 3600 + 30 * 60).unwrap();
        let time = tz.timestamp_opt(0, 0).unwrap();

        let commit = Commit::new(None, "Ada <ada@example.com>", time, "root");

        assert!(commit.author().unwrap().ends_with(" -0330"));
        assert!(commit.parents().is_empty());
    }

    #[test]
    fn serialize_then_parse_preserves_fields() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let time = tz.timestamp_opt(42, 0).unwrap();
        let commit = Commit::new(None, "Ada <ada@example.com>", time, "root");

        let parsed = Commit::from_bytes(commit.serialize().unwrap()).unwrap();

        assert_eq!(parsed, commit);
    }
}
