use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::context::TeamContext;

/// Read contract for everything the work detector needs about a team
///
/// Implementations read each source independently and store per-source
/// failures inside the returned context. Only a failure to read the team
/// record itself is reported as `Err`.
#[async_trait]
pub trait TeamContextRepository: Send + Sync {
    /// Load the context of a team
    ///
    /// # Returns
    /// * `Ok(None)` - The team does not exist
    async fn get_team_context(&self, team_id: Uuid) -> Result<Option<TeamContext>, String>;
}
