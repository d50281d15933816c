use crate::core::error::{Result, SplitError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque identity of a group participant.
///
/// Two participants are the same participant if and only if their
/// identifiers compare equal. The engine never interprets the contents.
///
/// # Examples
///
/// ```
/// use split_ledger::core::party::ParticipantId;
///
/// let alice = ParticipantId::new("alice");
/// let bob = ParticipantId::new("bob");
/// assert_ne!(alice, bob);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this participant ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The fixed membership of a group.
///
/// Validated once at construction: non-empty, no blank identities,
/// no duplicates. Insertion order is preserved for enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipantSet {
    members: Vec<ParticipantId>,
    #[serde(skip)]
    index: HashSet<ParticipantId>,
}

impl ParticipantSet {
    pub fn new<I, P>(members: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<ParticipantId>,
    {
        let members: Vec<ParticipantId> = members.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return Err(SplitError::InvalidConfiguration(
                "participant set must not be empty".to_string(),
            ));
        }

        let mut index = HashSet::with_capacity(members.len());
        for member in &members {
            if member.is_empty() {
                return Err(SplitError::InvalidConfiguration(
                    "participant identity must not be empty".to_string(),
                ));
            }
            if !index.insert(member.clone()) {
                return Err(SplitError::InvalidConfiguration(format!(
                    "duplicate participant '{}'",
                    member
                )));
            }
        }

        Ok(Self { members, index })
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.index.contains(participant)
    }

    /// Fails with `UnknownParticipant` when `participant` is not a member.
    pub fn ensure_member(&self, participant: &ParticipantId) -> Result<()> {
        if self.contains(participant) {
            Ok(())
        } else {
            Err(SplitError::UnknownParticipant(participant.clone()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<'de> Deserialize<'de> for ParticipantSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let members = Vec::<ParticipantId>::deserialize(deserializer)?;
        ParticipantSet::new(members).map_err(serde::de::Error::custom)
    }
}
