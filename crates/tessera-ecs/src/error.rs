use crate::entity::Entity;

/// Errors raised by the entity registry and the system scheduler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity was removed (or never existed). Systems treat this as a no-op.
    #[error("entity {0} not found")]
    EntityNotFound(Entity),

    /// A system was started without a collaborator it cannot run without.
    #[error("system '{system}' is missing required {what}")]
    ConfigurationMissing {
        system: &'static str,
        what: &'static str,
    },
}
