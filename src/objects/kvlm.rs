use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

/// Key-value list with message: the text layout of commit objects.
///
/// Header lines are `key value`; a value spanning several lines continues on
/// lines starting with a single space. A blank line separates the headers
/// from the free-form message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Kvlm {
    headers: IndexMap<String, Vec<String>>,
    message: String,
}

impl Kvlm {
    pub fn parse(raw: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(raw)?;

        let (head, message) = text
            .split_once("\n\n")
            .ok_or_else(|| anyhow::anyhow!("invalid kvlm: missing message separator"))?;

        let mut kvlm = Kvlm {
            headers: IndexMap::new(),
            message: message.to_string(),
        };

        let mut current: Option<(String, String)> = None;

        for line in head.lines() {
            if let Some(continuation) = line.strip_prefix(' ') {
                let (_, value) = current
                    .as_mut()
                    .ok_or_else(|| anyhow::anyhow!("invalid kvlm: dangling continuation line"))?;
                value.push('\n');
                value.push_str(continuation);
                continue;
            }

            if let Some((key, value)) = current.take() {
                kvlm.push(key, value);
            }

            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| anyhow::anyhow!("invalid kvlm header line: {}", line))?;
            current = Some((key.to_string(), value.to_string()));
        }

        if let Some((key, value)) = current {
            kvlm.push(key, value);
        }

        Ok(kvlm)
    }

    pub fn serialize(&self) -> Bytes {
        let mut data = BytesMut::new();

        for (key, values) in &self.headers {
            for value in values {
                data.extend_from_slice(key.as_bytes());
                data.put_u8(b' ');
                data.extend_from_slice(value.replace('\n', "\n ").as_bytes());
                data.put_u8(b'\n');
            }
        }

        data.put_u8(b'\n');
        data.extend_from_slice(self.message.as_bytes());

        data.freeze()
    }

    /// Appends a value, keeping earlier values for the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.entry(key.into()).or_default().push(value.into());
    }

    /// get a single value of a key
    ///
    /// returns None if the key does not exist or the key has multiple values
    pub fn get_single(&self, key: &str) -> Option<&String> {
        match self.headers.get(key)?.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> &[String] {
        self.headers.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }
}
