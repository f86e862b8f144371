//! Access control for campaign resources.
//!
//! Every create/read/mutate decision in the API funnels through the rules in
//! this module: role gates, location visibility, creation defaults, and the
//! authorship checks on events and notes. Handlers own the *ordering* of
//! checks, which is observable behavior:
//!
//! - the admin role gate runs before any existence lookup, so a non-admin
//!   never learns whether an admin-only resource exists;
//! - existence runs before authorship, so an admin gets `NotFound` for a
//!   missing id and `Forbidden` for someone else's resource.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Player,
}

impl Default for Role {
    fn default() -> Self {
        Self::Player
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Player => write!(f, "player"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "player" => Ok(Self::Player),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        // Unknown roles in old rows get the least-privileged one
        s.parse().unwrap_or_default()
    }
}

/// A verified caller identity, as decoded from a bearer token. The role is
/// the snapshot taken at issue time, not a live lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The caller's role or authorship does not permit the action.
    #[error("Forbidden")]
    Forbidden,
}

/// How much of the location list a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Only rows with `visible = true`.
    VisibleOnly,
    /// Visible rows plus the caller's own pending submissions.
    VisibleOrOwn(String),
    /// Every row.
    All,
}

/// Visibility scope for the location list. Anonymous callers see approved
/// locations only; a player additionally sees their own suggestions still
/// awaiting approval; the narrator sees everything.
pub fn location_list_scope(viewer: Option<&Identity>) -> ListScope {
    match viewer {
        Some(id) if id.is_admin() => ListScope::All,
        Some(id) => ListScope::VisibleOrOwn(id.user_id.clone()),
        None => ListScope::VisibleOnly,
    }
}

/// Single-location visibility; mirrors `location_list_scope`.
pub fn can_view_location(
    viewer: Option<&Identity>,
    visible: bool,
    created_by: Option<&str>,
) -> bool {
    match location_list_scope(viewer) {
        ListScope::All => true,
        ListScope::VisibleOrOwn(uid) => visible || created_by == Some(uid.as_str()),
        ListScope::VisibleOnly => visible,
    }
}

/// The visibility a newly created location starts with. Non-admin creations
/// are suggestions and always start hidden, whatever the request asked for;
/// the narrator's choice is honored and defaults to visible.
pub fn visibility_on_create(creator: &Identity, requested: Option<bool>) -> bool {
    if creator.is_admin() {
        requested.unwrap_or(true)
    } else {
        false
    }
}

/// Owner-or-narrator gate for location updates. A `created_by` of `None`
/// (seed data) belongs to nobody, so only the narrator may touch it.
pub fn can_update_location(actor: &Identity, created_by: Option<&str>) -> bool {
    actor.is_admin() || created_by == Some(actor.user_id.as_str())
}

/// Only the narrator may flip a location's visibility; this is the approval
/// lever for player suggestions.
pub fn can_toggle_visibility(actor: &Identity) -> bool {
    actor.is_admin()
}

/// Admin role gate. Run this before any existence lookup on admin-only
/// resources.
pub fn require_admin(actor: &Identity) -> Result<(), PolicyError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PolicyError::Forbidden)
    }
}

/// Authorship gate for events and notes. Call only once the resource is
/// known to exist: mismatch must read as `Forbidden`, distinct from the
/// `NotFound` of a missing id.
pub fn require_author(actor: &Identity, author_id: &str) -> Result<(), PolicyError> {
    if actor.user_id == author_id {
        Ok(())
    } else {
        Err(PolicyError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Identity {
        Identity {
            user_id: "gm-1".to_string(),
            username: "narrator".to_string(),
            role: Role::Admin,
        }
    }

    fn player(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            username: format!("player-{}", id),
            role: Role::Player,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Player".parse::<Role>(), Ok(Role::Player));
        assert!("narrator".parse::<Role>().is_err());
        assert_eq!(Role::from("narrator".to_string()), Role::Player);
    }

    #[test]
    fn test_list_scope_by_role() {
        assert_eq!(location_list_scope(None), ListScope::VisibleOnly);
        assert_eq!(
            location_list_scope(Some(&player("p1"))),
            ListScope::VisibleOrOwn("p1".to_string())
        );
        assert_eq!(location_list_scope(Some(&admin())), ListScope::All);
    }

    #[test]
    fn test_anonymous_sees_visible_only() {
        assert!(can_view_location(None, true, None));
        assert!(!can_view_location(None, false, None));
        assert!(!can_view_location(None, false, Some("p1")));
    }

    #[test]
    fn test_player_sees_own_pending_suggestions() {
        let p1 = player("p1");
        assert!(can_view_location(Some(&p1), true, None));
        assert!(can_view_location(Some(&p1), false, Some("p1")));
        // another player's pending suggestion stays hidden
        assert!(!can_view_location(Some(&p1), false, Some("p2")));
        assert!(!can_view_location(Some(&p1), false, None));
    }

    #[test]
    fn test_admin_sees_everything() {
        let gm = admin();
        assert!(can_view_location(Some(&gm), false, None));
        assert!(can_view_location(Some(&gm), false, Some("p1")));
    }

    #[test]
    fn test_player_creations_are_forced_hidden() {
        let p1 = player("p1");
        assert!(!visibility_on_create(&p1, None));
        assert!(!visibility_on_create(&p1, Some(true)));
        assert!(!visibility_on_create(&p1, Some(false)));
    }

    #[test]
    fn test_admin_creations_honor_request_defaulting_visible() {
        let gm = admin();
        assert!(visibility_on_create(&gm, None));
        assert!(visibility_on_create(&gm, Some(true)));
        assert!(!visibility_on_create(&gm, Some(false)));
    }

    #[test]
    fn test_update_is_owner_or_admin() {
        let p1 = player("p1");
        assert!(can_update_location(&p1, Some("p1")));
        assert!(!can_update_location(&p1, Some("p2")));
        assert!(!can_update_location(&p1, None));
        assert!(can_update_location(&admin(), Some("p1")));
        assert!(can_update_location(&admin(), None));
    }

    #[test]
    fn test_visibility_toggle_is_admin_only() {
        assert!(can_toggle_visibility(&admin()));
        assert!(!can_toggle_visibility(&player("p1")));
    }

    #[test]
    fn test_require_admin() {
        assert_eq!(require_admin(&admin()), Ok(()));
        assert_eq!(require_admin(&player("p1")), Err(PolicyError::Forbidden));
    }

    #[test]
    fn test_require_author_is_strict_identity_equality() {
        let gm = admin();
        assert_eq!(require_author(&gm, "gm-1"), Ok(()));
        // even another admin is not the author
        assert_eq!(require_author(&gm, "gm-2"), Err(PolicyError::Forbidden));
    }
}
