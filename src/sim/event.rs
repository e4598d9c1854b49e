/// Events emitted during a simulation step.
/// Animation, scoring and sound collaborators consume these instead of
/// polling collision reports.

use crate::domain::path::PathError;

/// Which actor an event is about.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorRef {
    Player,
    /// Index into `World::walkers`.
    Walker(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// Just landed on a floor or platform after being airborne.
    Landed { actor: ActorRef },
    /// Depenetration failed while a platform was pushing.
    Squashed { actor: ActorRef },
    /// Head bumped a grid cell from below.
    Bumped { actor: ActorRef, cell: usize },
    TileBroken { cell: usize },
    TileRevealed { cell: usize },
    EnteredLiquid { actor: ActorRef },
    Lethal { actor: ActorRef },
    FellOut { actor: ActorRef },
    Stomped { walker: usize },
    PlayerHit { walker: usize },
    /// A platform path no longer fits the grid; the platform is paused.
    PathWarning { platform: usize, error: PathError },
}
