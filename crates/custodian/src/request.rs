//! Access requests.

use std::collections::BTreeMap;

use custodian_types::{Action, Actor, InvalidInput, PermissionName, ResourceId};

/// One attempt by an authenticated actor to perform an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub actor: Actor,
    /// The targeted resource, if any.
    pub resource: Option<ResourceId>,
    pub action: Action,
    /// Permission the call site requires. RBAC only runs when this is set.
    pub permission: Option<PermissionName>,
    pub network_origin: Option<String>,
    /// Caller-supplied values rules can match on.
    pub extra: BTreeMap<String, String>,
}

impl AccessRequest {
    pub fn new(actor: Actor, action: Action) -> Self {
        Self {
            actor,
            resource: None,
            action,
            permission: None,
            network_origin: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_permission(mut self, permission: PermissionName) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn with_network_origin(mut self, origin: &str) -> Self {
        self.network_origin = Some(origin.to_string());
        self
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    /// Rejects requests that no gate could meaningfully evaluate.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.actor.id.is_blank() {
            return Err(InvalidInput::Empty { field: "actor id" });
        }
        if self.actor.role.is_blank() {
            return Err(InvalidInput::Empty { field: "actor role" });
        }
        if self.resource.as_ref().is_some_and(ResourceId::is_blank) {
            return Err(InvalidInput::Empty {
                field: "resource id",
            });
        }
        if self
            .network_origin
            .as_deref()
            .is_some_and(|origin| origin.trim().is_empty())
        {
            return Err(InvalidInput::Empty {
                field: "network origin",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_types::SecurityLevel;

    fn actor(id: &str, role: &str) -> Actor {
        Actor::new(id, role, SecurityLevel::Internal)
    }

    #[test]
    fn well_formed_request_validates() {
        let request = AccessRequest::new(actor("u-1", "r-emp"), Action::View)
            .with_resource("doc-1")
            .with_network_origin("10.0.0.1");
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let blank_actor = AccessRequest::new(actor(" ", "r-emp"), Action::View);
        assert_eq!(
            blank_actor.validate(),
            Err(InvalidInput::Empty { field: "actor id" })
        );

        let blank_role = AccessRequest::new(actor("u-1", ""), Action::View);
        assert_eq!(
            blank_role.validate(),
            Err(InvalidInput::Empty {
                field: "actor role"
            })
        );

        let blank_resource =
            AccessRequest::new(actor("u-1", "r-emp"), Action::View).with_resource("");
        assert_eq!(
            blank_resource.validate(),
            Err(InvalidInput::Empty {
                field: "resource id"
            })
        );
    }
}
