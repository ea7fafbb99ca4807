//! Lock modes and options applied to select statements.

use serde::{Deserialize, Serialize};

/// Lock modes, ordered from weakest to strongest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    Read,
    Optimistic,
    OptimisticForceIncrement,
    PessimisticRead,
    PessimisticWrite,
    UpgradeNowait,
    UpgradeSkipLocked,
    PessimisticForceIncrement,
}

impl LockMode {
    /// Whether the mode is enforced by a database lock clause.
    pub fn is_pessimistic(self) -> bool {
        matches!(
            self,
            LockMode::PessimisticRead
                | LockMode::PessimisticWrite
                | LockMode::UpgradeNowait
                | LockMode::UpgradeSkipLocked
                | LockMode::PessimisticForceIncrement
        )
    }

    pub fn greater_than(self, other: LockMode) -> bool {
        self > other
    }

    /// Parse the external name (`pessimistic_write`, `upgrade_nowait`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => LockMode::None,
            "read" => LockMode::Read,
            "optimistic" => LockMode::Optimistic,
            "optimistic_force_increment" => LockMode::OptimisticForceIncrement,
            "pessimistic_read" => LockMode::PessimisticRead,
            "pessimistic_write" | "upgrade" => LockMode::PessimisticWrite,
            "upgrade_nowait" => LockMode::UpgradeNowait,
            "upgrade_skiplocked" | "upgrade_skip_locked" => LockMode::UpgradeSkipLocked,
            "pessimistic_force_increment" => LockMode::PessimisticForceIncrement,
            _ => return None,
        })
    }
}

/// How long to wait for a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTimeout {
    #[default]
    WaitForever,
    NoWait,
    SkipLocked,
    Millis(u64),
}

/// Lock options for one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockOptions {
    pub mode: LockMode,
    pub timeout: LockTimeout,
    /// Lock modes requested for individual identification variables.
    #[serde(default)]
    pub alias_modes: Vec<(String, LockMode)>,
}

impl LockOptions {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: LockTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_alias_mode(mut self, alias: impl Into<String>, mode: LockMode) -> Self {
        self.alias_modes.push((alias.into(), mode));
        self
    }

    /// The strongest mode among the global mode and all alias modes.
    pub fn effective_mode(&self) -> LockMode {
        self.alias_modes
            .iter()
            .map(|(_, m)| *m)
            .fold(self.mode, |acc, m| if m.greater_than(acc) { m } else { acc })
    }

    /// Timeout implied by the effective mode, overriding the configured one
    /// for the `Upgrade*` shortcuts.
    pub fn effective_timeout(&self) -> LockTimeout {
        match self.effective_mode() {
            LockMode::UpgradeNowait | LockMode::PessimisticForceIncrement => LockTimeout::NoWait,
            LockMode::UpgradeSkipLocked => LockTimeout::SkipLocked,
            _ => self.timeout,
        }
    }

    pub fn requires_lock_clause(&self) -> bool {
        self.effective_mode().is_pessimistic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_mode_takes_strongest_alias() {
        let options = LockOptions::new(LockMode::Read)
            .with_alias_mode("a", LockMode::PessimisticWrite)
            .with_alias_mode("b", LockMode::Optimistic);
        assert_eq!(options.effective_mode(), LockMode::PessimisticWrite);
        assert!(options.requires_lock_clause());
    }

    #[test]
    fn test_upgrade_shortcuts_imply_timeout() {
        assert_eq!(
            LockOptions::new(LockMode::UpgradeNowait).effective_timeout(),
            LockTimeout::NoWait
        );
        assert_eq!(
            LockOptions::new(LockMode::UpgradeSkipLocked).effective_timeout(),
            LockTimeout::SkipLocked
        );
        assert!(!LockOptions::new(LockMode::Optimistic).requires_lock_clause());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(LockMode::from_name("upgrade-nowait"), Some(LockMode::UpgradeNowait));
        assert_eq!(LockMode::from_name("bogus"), None);
    }
}
