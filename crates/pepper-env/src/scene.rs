//! Scene bodies of one episode: the forbidden table and the reach target.

use pepper_core::config::SceneConfig;
use pepper_core::error::SimError;
use pepper_core::traits::SimSession;
use pepper_core::types::{BodyHandle, Pose};
use rand::Rng;
use tracing::{debug, warn};

/// Handles and reference poses recorded when the scene is spawned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scene {
    pub table: BodyHandle,
    pub target: BodyHandle,
    /// Table pose right after spawning; displacement is measured from here.
    pub table_initial: Pose,
}

impl Scene {
    /// Spawn table and target. The target's x and y get independent draws
    /// from `target_position_noise`.
    pub fn spawn<R: Rng + ?Sized>(
        session: &mut dyn SimSession,
        config: &SceneConfig,
        rng: &mut R,
    ) -> Result<Self, SimError> {
        let table = session.spawn_body(&config.table.body_spec())?;

        let [x, y, z] = config.target.position;
        let noise = &config.target_position_noise;
        let position = [x + noise.sample(rng), y + noise.sample(rng), z];
        let target = match session.spawn_body(&config.target.body_spec_at(position)) {
            Ok(target) => target,
            Err(err) => return Err(discard(session, &[table], err)),
        };

        let table_initial = match session.body_pose(table) {
            Ok(pose) => pose,
            Err(err) => return Err(discard(session, &[target, table], err)),
        };
        debug!(?table, ?target, target_position = ?position, "scene spawned");
        Ok(Self {
            table,
            target,
            table_initial,
        })
    }

    /// Remove both bodies.
    pub fn despawn(&self, session: &mut dyn SimSession) -> Result<(), SimError> {
        session.remove_body(self.target)?;
        session.remove_body(self.table)?;
        Ok(())
    }

    /// Record the table's settled pose as the displacement reference.
    pub fn rebase(&mut self, session: &dyn SimSession) -> Result<(), SimError> {
        self.table_initial = session.body_pose(self.table)?;
        Ok(())
    }
}

/// Remove bodies spawned before `err` so a failed spawn leaves nothing behind.
fn discard(session: &mut dyn SimSession, bodies: &[BodyHandle], err: SimError) -> SimError {
    for body in bodies {
        if let Err(cleanup) = session.remove_body(*body) {
            warn!(?body, %cleanup, "could not remove partially spawned body");
        }
    }
    err
}
