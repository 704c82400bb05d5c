use chrono::{DateTime, SecondsFormat, Utc};

use crate::activity::Language;
use crate::pulse::error::PulseError;

/// Experience gathered during one open window.
///
/// Entries keep the order in which their language was first seen, which is
/// also the order they are serialized in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pulse {
    started_at: DateTime<Utc>,
    sealed_at: Option<DateTime<Utc>>,
    experience: Vec<(Language, u64)>,
}

impl Pulse {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            sealed_at: None,
            experience: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn sealed_at(&self) -> Option<DateTime<Utc>> {
        self.sealed_at
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed_at.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.experience.is_empty()
    }

    pub fn add(&mut self, language: &Language, amount: u64) -> Result<(), PulseError> {
        if amount == 0 {
            return Err(PulseError::ZeroAmount);
        }
        if self.is_sealed() {
            return Err(PulseError::Sealed);
        }

        match self
            .experience
            .iter_mut()
            .find(|(existing, _)| existing == language)
        {
            Some((_, xp)) => *xp = xp.saturating_add(amount),
            None => self.experience.push((language.clone(), amount)),
        }
        Ok(())
    }

    pub fn experience(&self) -> impl Iterator<Item = (&Language, u64)> {
        self.experience.iter().map(|(language, xp)| (language, *xp))
    }

    pub fn total_experience(&self) -> u64 {
        self.experience
            .iter()
            .fold(0u64, |total, (_, xp)| total.saturating_add(*xp))
    }

    pub fn seal(&mut self, now: DateTime<Utc>) -> Result<(), PulseError> {
        if let Some(sealed_at) = self.sealed_at {
            return Err(PulseError::AlreadySealed(
                sealed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        self.sealed_at = Some(now);
        Ok(())
    }
}
