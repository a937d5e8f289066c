use std::fmt;

/// Service worker lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  /// Registered, install not started
  Parsed,
  /// Install event dispatched
  Installing,
  /// Precache manifest being fetched and stored
  Caching,
  /// Installed; waiting for activation
  WaitingToActivate,
  /// Activate event dispatched
  Activating,
  /// Deleting buckets of older cache generations
  EvictingStale,
  /// Controlling pages and intercepting fetches
  Active,
  /// Installation failed; the worker will never run
  Redundant,
}

impl WorkerState {
  /// Check if this state allows fetch interception
  pub fn can_intercept_fetch(&self) -> bool {
    matches!(self, WorkerState::Active)
  }

  pub fn can_transition_to(&self, next: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
      (*self, next),
      (Parsed, Installing)
        | (Installing, Caching)
        | (Caching, WaitingToActivate)
        | (Installing | Caching, Redundant)
        | (Parsed | WaitingToActivate, Activating)
        | (Activating, EvictingStale)
        | (EvictingStale, Active)
    )
  }
}

impl fmt::Display for WorkerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkerState::Parsed => write!(f, "parsed"),
      WorkerState::Installing => write!(f, "installing"),
      WorkerState::Caching => write!(f, "caching"),
      WorkerState::WaitingToActivate => write!(f, "waiting-to-activate"),
      WorkerState::Activating => write!(f, "activating"),
      WorkerState::EvictingStale => write!(f, "evicting-stale"),
      WorkerState::Active => write!(f, "active"),
      WorkerState::Redundant => write!(f, "redundant"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_happy_path_is_linear() {
    let path = [
      WorkerState::Parsed,
      WorkerState::Installing,
      WorkerState::Caching,
      WorkerState::WaitingToActivate,
      WorkerState::Activating,
      WorkerState::EvictingStale,
      WorkerState::Active,
    ];

    for pair in path.windows(2) {
      assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
  }

  #[test]
  fn test_no_skipping_or_going_back() {
    assert!(!WorkerState::Installing.can_transition_to(WorkerState::Active));
    assert!(!WorkerState::Active.can_transition_to(WorkerState::Installing));
    assert!(!WorkerState::Redundant.can_transition_to(WorkerState::Activating));
    assert!(!WorkerState::Active.can_transition_to(WorkerState::Redundant));
  }

  #[test]
  fn test_only_active_intercepts() {
    assert!(WorkerState::Active.can_intercept_fetch());
    assert!(!WorkerState::WaitingToActivate.can_intercept_fetch());
    assert!(!WorkerState::Redundant.can_intercept_fetch());
  }

  #[test]
  fn test_display() {
    assert_eq!(WorkerState::WaitingToActivate.to_string(), "waiting-to-activate");
    assert_eq!(WorkerState::EvictingStale.to_string(), "evicting-stale");
  }
}
