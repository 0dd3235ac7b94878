/// Authorization predicates
///
/// Each protected operation has one predicate taking the requester and the
/// resource and returning a [`Decision`]. Handlers turn a deny into
/// [`AuthzError::Denied`] with [`ensure`].
///
/// | Operation                       | Allowed for            |
/// |---------------------------------|------------------------|
/// | read anything                   | everyone               |
/// | create recipe, relations        | any authenticated user |
/// | update/delete recipe            | author or admin        |
/// | create/delete ingredient        | admin                  |

use super::middleware::AuthContext;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("{0}")]
    Denied(String),
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,

    /// Denied, with the reason shown to the client
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Recipe updates and deletes: the author or an admin
pub fn recipe_write(requester: &AuthContext, author_id: i64) -> Decision {
    if requester.user_id == author_id || requester.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny("Only the author can modify this recipe".to_string())
    }
}

/// Ingredient catalog changes: admins only
pub fn catalog_write(requester: &AuthContext) -> Decision {
    if requester.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny("Only administrators can modify the ingredient catalog".to_string())
    }
}

pub fn ensure(decision: Decision) -> Result<(), AuthzError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(AuthzError::Denied(reason)),
    }
}
