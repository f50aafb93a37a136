//! The state threaded through a pipeline run.

use std::borrow::Borrow;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::claim::{ClaimEvidence, ClaimVerdict, Verdict};
use crate::descriptor::SolverDescriptor;
use crate::error::ExecutionError;

/// Name of a state entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for StateKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&StateKey> for StateKey {
    fn from(key: &StateKey) -> Self {
        key.clone()
    }
}

impl Borrow<str> for StateKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A typed state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StateValue {
    Text(String),
    Claims(Vec<String>),
    Evidence(Vec<ClaimEvidence>),
    ClaimVerdicts(Vec<ClaimVerdict>),
    Verdict(Verdict),
    Json(serde_json::Value),
}

impl StateValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StateValue::Text(_) => "text",
            StateValue::Claims(_) => "claims",
            StateValue::Evidence(_) => "evidence",
            StateValue::ClaimVerdicts(_) => "claim_verdicts",
            StateValue::Verdict(_) => "verdict",
            StateValue::Json(_) => "json",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_claims(&self) -> Option<&[String]> {
        match self {
            StateValue::Claims(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_evidence(&self) -> Option<&[ClaimEvidence]> {
        match self {
            StateValue::Evidence(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_claim_verdicts(&self) -> Option<&[ClaimVerdict]> {
        match self {
            StateValue::ClaimVerdicts(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_verdict(&self) -> Option<Verdict> {
        match self {
            StateValue::Verdict(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for StateValue {
    fn from(text: &str) -> Self {
        StateValue::Text(text.to_string())
    }
}

impl From<String> for StateValue {
    fn from(text: String) -> Self {
        StateValue::Text(text)
    }
}

impl From<Verdict> for StateValue {
    fn from(verdict: Verdict) -> Self {
        StateValue::Verdict(verdict)
    }
}

/// Typed read access shared by [`State`] and [`StageState`].
pub trait StateRead {
    /// Look up a raw value.
    fn value(&self, key: &str) -> Result<&StateValue, ExecutionError>;

    fn text(&self, key: &str) -> Result<&str, ExecutionError> {
        let value = self.value(key)?;
        value.as_text().ok_or_else(|| mismatch(key, "text", value))
    }

    fn claims(&self, key: &str) -> Result<&[String], ExecutionError> {
        let value = self.value(key)?;
        value.as_claims().ok_or_else(|| mismatch(key, "claims", value))
    }

    fn evidence(&self, key: &str) -> Result<&[ClaimEvidence], ExecutionError> {
        let value = self.value(key)?;
        value
            .as_evidence()
            .ok_or_else(|| mismatch(key, "evidence", value))
    }

    fn claim_verdicts(&self, key: &str) -> Result<&[ClaimVerdict], ExecutionError> {
        let value = self.value(key)?;
        value
            .as_claim_verdicts()
            .ok_or_else(|| mismatch(key, "claim_verdicts", value))
    }

    fn verdict(&self, key: &str) -> Result<Verdict, ExecutionError> {
        let value = self.value(key)?;
        value
            .as_verdict()
            .ok_or_else(|| mismatch(key, "verdict", value))
    }
}

fn mismatch(key: &str, expected: &'static str, found: &StateValue) -> ExecutionError {
    ExecutionError::TypeMismatch {
        key: StateKey::from(key),
        expected,
        found: found.type_name(),
    }
}

/// Insertion-ordered key/value store threaded through a run.
///
/// Overwriting an existing key is allowed and logged. Reading a key that was
/// never written is an [`ExecutionError::MissingKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    entries: Vec<(StateKey, StateValue)>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used to seed the initial state.
    pub fn with(mut self, key: impl Into<StateKey>, value: impl Into<StateValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<StateKey>,
        value: impl Into<StateValue>,
    ) -> Option<StateValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => {
                warn!(key = %key, "Overwriting existing state value");
                Some(std::mem::replace(slot, value))
            }
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        let index = self.entries.iter().position(|(k, _)| k.as_str() == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &StateValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateRead for State {
    fn value(&self, key: &str) -> Result<&StateValue, ExecutionError> {
        self.get(key)
            .ok_or_else(|| ExecutionError::MissingKey(StateKey::from(key)))
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StateVisitor;

        impl<'de> Visitor<'de> for StateVisitor {
            type Value = State;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of state keys to typed values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<State, A::Error> {
                let mut entries: Vec<(StateKey, StateValue)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<StateKey, StateValue>()? {
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, slot)) => *slot = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(State { entries })
            }
        }

        deserializer.deserialize_map(StateVisitor)
    }
}

/// A solver's view of the state during one stage.
///
/// Reads are limited to the descriptor's input keys and writes to its output
/// keys.
pub struct StageState<'a> {
    state: &'a mut State,
    descriptor: &'a SolverDescriptor,
}

impl<'a> StageState<'a> {
    pub fn new(state: &'a mut State, descriptor: &'a SolverDescriptor) -> Self {
        Self { state, descriptor }
    }

    pub fn stage(&self) -> &str {
        &self.descriptor.name
    }

    /// Write a declared output key.
    pub fn set(
        &mut self,
        key: impl Into<StateKey>,
        value: impl Into<StateValue>,
    ) -> Result<(), ExecutionError> {
        let key = key.into();
        if !self.descriptor.declares_output(key.as_str()) {
            return Err(ExecutionError::UndeclaredWrite {
                stage: self.descriptor.name.clone(),
                key,
            });
        }
        self.state.insert(key, value);
        Ok(())
    }
}

impl StateRead for StageState<'_> {
    fn value(&self, key: &str) -> Result<&StateValue, ExecutionError> {
        if !self.descriptor.declares_input(key) {
            return Err(ExecutionError::UndeclaredRead {
                stage: self.descriptor.name.clone(),
                key: StateKey::from(key),
            });
        }
        self.state.value(key)
    }
}
