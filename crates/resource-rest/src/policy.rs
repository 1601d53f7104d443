// Archivo: policy.rs
// Propósito: control de acceso por roles que el adaptador evalúa antes de
// llamar al servicio.
use crate::errors::RestError;
use crate::request::Action;
use indexmap::{IndexMap, IndexSet};

pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// Quién hace la petición. Sin nombre de usuario es anónimo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    pub username: Option<String>,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user<I, S>(username: impl Into<String>, roles: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { username: Some(username.into()),
               roles: roles.into_iter().map(Into::into).collect() }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}

/// Decide si `principal` puede ejecutar `action` sobre el recurso `kind`.
pub trait AccessPolicy: Send + Sync {
    fn check(&self, principal: &Principal, action: Action, kind: &str) -> Result<(), RestError>;
}

/// Política por jerarquía de roles: cada acción exige un rol y un rol
/// implica los que tiene por debajo.
///
/// Por defecto las lecturas exigen `ROLE_USER`, las escrituras
/// `ROLE_ADMIN`, y `ROLE_ADMIN` implica `ROLE_USER`.
#[derive(Debug, Clone)]
pub struct RoleHierarchyPolicy {
    required: IndexMap<Action, String>,
    implies: IndexMap<String, Vec<String>>,
}

impl Default for RoleHierarchyPolicy {
    fn default() -> Self {
        let mut required = IndexMap::new();
        for action in [Action::Find, Action::FindOne] {
            required.insert(action, ROLE_USER.to_string());
        }
        for action in [Action::Create, Action::Update, Action::Delete] {
            required.insert(action, ROLE_ADMIN.to_string());
        }
        let mut implies = IndexMap::new();
        implies.insert(ROLE_ADMIN.to_string(), vec![ROLE_USER.to_string()]);
        Self { required, implies }
    }
}

impl RoleHierarchyPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cambia el rol exigido para una acción.
    pub fn require(mut self, action: Action, role: impl Into<String>) -> Self {
        self.required.insert(action, role.into());
        self
    }

    /// Declara que `role` implica `implied`.
    pub fn imply(mut self, role: impl Into<String>, implied: impl Into<String>) -> Self {
        self.implies.entry(role.into()).or_default().push(implied.into());
        self
    }

    /// Roles del principal más todos los implícitos (cierre transitivo).
    pub fn effective_roles(&self, principal: &Principal) -> IndexSet<String> {
        let mut roles: IndexSet<String> = IndexSet::new();
        let mut pending: Vec<String> = principal.roles.clone();
        while let Some(role) = pending.pop() {
            if roles.insert(role.clone()) {
                if let Some(implied) = self.implies.get(&role) {
                    pending.extend(implied.iter().cloned());
                }
            }
        }
        roles
    }
}

impl AccessPolicy for RoleHierarchyPolicy {
    fn check(&self, principal: &Principal, action: Action, kind: &str) -> Result<(), RestError> {
        if !principal.is_authenticated() {
            return Err(RestError::Unauthenticated);
        }
        let Some(required) = self.required.get(&action) else {
            return Ok(());
        };
        if self.effective_roles(principal).contains(required) {
            Ok(())
        } else {
            log::warn!("{:?} sobre {} denegado a {:?}", action, kind, principal.username);
            Err(RestError::Forbidden(required.clone()))
        }
    }
}
