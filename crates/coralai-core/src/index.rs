//! Immutable name → depth-range mapping built once by the allocator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use crate::WorldError;

/// Named address into the world buffer.
///
/// Deserializes from `"energy"`, `["com", "a"]` or `["com", ["a", "b"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelKey {
    /// A whole top-level channel.
    Id(String),
    /// One subchannel of a grouped channel.
    Sub(String, String),
    /// Several subchannels of one channel, concatenated in the given order.
    Subs(String, Vec<String>),
}

impl ChannelKey {
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    #[must_use]
    pub fn sub(channel: impl Into<String>, subchannel: impl Into<String>) -> Self {
        Self::Sub(channel.into(), subchannel.into())
    }

    #[must_use]
    pub fn subs<I, S>(channel: impl Into<String>, subchannels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Subs(
            channel.into(),
            subchannels.into_iter().map(Into::into).collect(),
        )
    }

    /// The top-level channel this key addresses.
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::Id(id) | Self::Sub(id, _) | Self::Subs(id, _) => id,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Sub(id, sub) => write!(f, "{id}.{sub}"),
            Self::Subs(id, subs) => write!(f, "{id}.[{}]", subs.join(",")),
        }
    }
}

impl From<&str> for ChannelKey {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for ChannelKey {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<(&str, &str)> for ChannelKey {
    fn from((channel, sub): (&str, &str)) -> Self {
        Self::sub(channel, sub)
    }
}

impl<const N: usize> From<(&str, [&str; N])> for ChannelKey {
    fn from((channel, subs): (&str, [&str; N])) -> Self {
        Self::subs(channel, subs)
    }
}

/// Resolved depth range of one channel and, for grouped channels, of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNode {
    indices: Range<usize>,
    subchannels: Vec<(String, IndexNode)>,
}

impl IndexNode {
    pub(crate) fn leaf(indices: Range<usize>) -> Self {
        Self {
            indices,
            subchannels: Vec::new(),
        }
    }

    pub(crate) fn group(indices: Range<usize>, subchannels: Vec<(String, IndexNode)>) -> Self {
        Self {
            indices,
            subchannels,
        }
    }

    #[must_use]
    pub fn indices(&self) -> Range<usize> {
        self.indices.clone()
    }

    /// Children in declaration order.
    #[must_use]
    pub fn subchannels(&self) -> &[(String, IndexNode)] {
        &self.subchannels
    }

    #[must_use]
    pub fn subchannel(&self, id: &str) -> Option<&IndexNode> {
        self.subchannels
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, node)| node)
    }
}

/// Frozen lookup table from channel names to buffer depth ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTree {
    entries: Vec<(String, IndexNode)>,
    lookup: HashMap<String, usize>,
    depth: usize,
}

impl IndexTree {
    pub(crate) fn new(entries: Vec<(String, IndexNode)>, depth: usize) -> Self {
        let lookup = entries
            .iter()
            .enumerate()
            .map(|(pos, (id, _))| (id.clone(), pos))
            .collect();
        Self {
            entries,
            lookup,
            depth,
        }
    }

    /// Total per-cell depth covered by the tree.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Channels in buffer layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexNode)> + '_ {
        self.entries.iter().map(|(id, node)| (id.as_str(), node))
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&IndexNode> {
        self.lookup.get(id).map(|&pos| &self.entries[pos].1)
    }

    fn require(&self, id: &str) -> Result<&IndexNode, WorldError> {
        self.node(id).ok_or_else(|| WorldError::UnknownChannel { id: id.to_string() })
    }

    fn require_sub<'a>(&'a self, id: &str, sub: &str) -> Result<&'a IndexNode, WorldError> {
        self.require(id)?
            .subchannel(sub)
            .ok_or_else(|| WorldError::UnknownSubchannel {
                channel: id.to_string(),
                subchannel: sub.to_string(),
            })
    }

    /// Depth indices addressed by `key`, in request order.
    pub fn indices(&self, key: &ChannelKey) -> Result<Vec<usize>, WorldError> {
        match key {
            ChannelKey::Id(id) => Ok(self.require(id)?.indices().collect()),
            ChannelKey::Sub(id, sub) => Ok(self.require_sub(id, sub)?.indices().collect()),
            ChannelKey::Subs(id, subs) => {
                let mut indices = Vec::new();
                for sub in subs {
                    indices.extend(self.require_sub(id, sub)?.indices());
                }
                Ok(indices)
            }
        }
    }

    /// Concatenated depth indices for a heterogeneous list of keys.
    pub fn indices_for(&self, keys: &[ChannelKey]) -> Result<Vec<usize>, WorldError> {
        let mut indices = Vec::new();
        for key in keys {
            indices.extend(self.indices(key)?);
        }
        Ok(indices)
    }

    /// Reverse lookup of a depth index to `(channel, subchannel)` names.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<(&str, Option<&str>)> {
        let (id, node) = self
            .entries
            .iter()
            .find(|(_, node)| node.indices.contains(&index))?;
        let sub = node
            .subchannels
            .iter()
            .find(|(_, child)| child.indices.contains(&index))
            .map(|(name, _)| name.as_str());
        Some((id.as_str(), sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> IndexTree {
        let com = IndexNode::group(
            2..5,
            vec![
                ("a".to_string(), IndexNode::leaf(2..3)),
                ("b".to_string(), IndexNode::leaf(3..5)),
            ],
        );
        IndexTree::new(
            vec![
                ("energy".to_string(), IndexNode::leaf(0..1)),
                ("infra".to_string(), IndexNode::leaf(1..2)),
                ("com".to_string(), com),
            ],
            5,
        )
    }

    #[test]
    fn lookups_follow_request_order() {
        let tree = sample_tree();
        assert_eq!(tree.indices(&"com".into()), Ok(vec![2, 3, 4]));
        assert_eq!(tree.indices(&("com", "b").into()), Ok(vec![3, 4]));
        assert_eq!(tree.indices(&("com", ["b", "a"]).into()), Ok(vec![3, 4, 2]));
        let keys = [
            ChannelKey::from("infra"),
            ChannelKey::from(("com", "a")),
            ChannelKey::from("energy"),
        ];
        assert_eq!(tree.indices_for(&keys), Ok(vec![1, 2, 0]));
    }

    #[test]
    fn unknown_names_are_reported() {
        let tree = sample_tree();
        assert_eq!(
            tree.indices(&"light".into()),
            Err(WorldError::UnknownChannel {
                id: "light".to_string()
            })
        );
        assert_eq!(
            tree.indices(&("com", "z").into()),
            Err(WorldError::UnknownSubchannel {
                channel: "com".to_string(),
                subchannel: "z".to_string()
            })
        );
    }

    #[test]
    fn name_at_resolves_subchannels() {
        let tree = sample_tree();
        assert_eq!(tree.name_at(0), Some(("energy", None)));
        assert_eq!(tree.name_at(4), Some(("com", Some("b"))));
        assert_eq!(tree.name_at(5), None);
    }

    #[test]
    fn keys_deserialize_from_json_shapes() {
        let keys: Vec<ChannelKey> =
            serde_json::from_str(r#"["energy", ["com", "a"], ["com", ["a", "b"]]]"#)
                .expect("keys");
        assert_eq!(
            keys,
            vec![
                ChannelKey::id("energy"),
                ChannelKey::sub("com", "a"),
                ChannelKey::subs("com", ["a", "b"]),
            ]
        );
        assert_eq!(keys[2].to_string(), "com.[a,b]");
    }
}
