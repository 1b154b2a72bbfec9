//! Level-reset capability used by both terminal sequences.

/// Reloads the active level, discarding all runtime state.
pub trait LevelControl: Send {
    fn reload_current_level(&mut self);
}
