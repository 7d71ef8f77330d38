//! Core types and identifiers used throughout the system

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                s.trim().parse::<u64>().map(Self).map_err(|_| Error::UnknownValue {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }
    };
}

numeric_id!(
    /// Rule identifier (assigned by the server)
    RuleId
);
numeric_id!(
    /// Role identifier
    RoleId
);
numeric_id!(
    /// User identifier
    UserId
);
numeric_id!(
    /// Organization identifier
    OrganizationId
);
numeric_id!(
    /// Collaboration identifier
    CollaborationId
);

/// Closed enumeration parsed case-insensitively from its lowercase wire name.
///
/// Values outside the enumeration are rejected at the type boundary instead of
/// being mapped onto a default.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Lowercase wire name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(Error::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

closed_enum!(
    /// Domain object type a rule governs
    Resource, "resource" {
        User => "user",
        Organization => "organization",
        Collaboration => "collaboration",
        Role => "role",
        Node => "node",
        Task => "task",
        Run => "run",
        Event => "event",
        Port => "port",
        Rule => "rule",
        /// Wildcard: matches every resource when used in a query
        Any => "any",
    }
);

closed_enum!(
    /// Breadth at which a rule applies
    Scope, "scope" {
        Own => "own",
        Organization => "organization",
        Collaboration => "collaboration",
        Global => "global",
        /// Wildcard: granted at any scope at all
        Any => "any",
    }
);

closed_enum!(
    /// Action a rule authorizes
    Operation, "operation" {
        View => "view",
        Create => "create",
        Edit => "edit",
        Delete => "delete",
        Send => "send",
        Receive => "receive",
        /// Wildcard: matches every operation when used in a query
        Any => "any",
    }
);

impl Resource {
    /// Every concrete resource, in display order
    pub const CONCRETE: [Resource; 10] = [
        Resource::User,
        Resource::Organization,
        Resource::Collaboration,
        Resource::Role,
        Resource::Node,
        Resource::Task,
        Resource::Run,
        Resource::Event,
        Resource::Port,
        Resource::Rule,
    ];

    /// Whether `self`, used as a query value, matches a rule's resource
    pub fn matches(&self, rule_value: Resource) -> bool {
        *self == Resource::Any || *self == rule_value
    }
}

impl Scope {
    /// Every concrete scope, narrowest first
    pub const CONCRETE: [Scope; 4] = [
        Scope::Own,
        Scope::Organization,
        Scope::Collaboration,
        Scope::Global,
    ];

    /// Position in the hierarchy (own = 0 .. global = 3), `None` for the wildcard
    pub fn breadth(&self) -> Option<u8> {
        match self {
            Scope::Own => Some(0),
            Scope::Organization => Some(1),
            Scope::Collaboration => Some(2),
            Scope::Global => Some(3),
            Scope::Any => None,
        }
    }

    /// Whether `self` is a concrete scope at least as broad as `other`
    pub fn covers(&self, other: Scope) -> bool {
        match (self.breadth(), other.breadth()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl Operation {
    /// Fixed column order of the permission matrix
    pub const CONCRETE: [Operation; 6] = [
        Operation::View,
        Operation::Create,
        Operation::Edit,
        Operation::Delete,
        Operation::Send,
        Operation::Receive,
    ];

    /// Whether `self`, used as a query value, matches a rule's operation
    pub fn matches(&self, rule_value: Operation) -> bool {
        *self == Operation::Any || *self == rule_value
    }

    /// Check if this operation is a write that depends on `view`
    pub fn requires_view(&self) -> bool {
        !matches!(self, Operation::View | Operation::Any)
    }
}

/// Composite (resource, scope, operation) key used for matching rules
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct RuleKey {
    pub resource: Resource,
    pub scope: Scope,
    pub operation: Operation,
}

impl RuleKey {
    pub fn new(resource: Resource, scope: Scope, operation: Operation) -> Self {
        Self {
            resource,
            scope,
            operation,
        }
    }

    /// Same resource and scope, different operation
    pub fn with_operation(&self, operation: Operation) -> Self {
        Self { operation, ..*self }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.resource, self.scope, self.operation)
    }
}

/// A single grantable permission as defined by the server
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct Rule {
    pub id: RuleId,
    /// Older servers send the resource under `name`
    #[serde(alias = "name")]
    pub resource: Resource,
    pub scope: Scope,
    pub operation: Operation,
}

impl Rule {
    pub fn new(id: u64, resource: Resource, scope: Scope, operation: Operation) -> Self {
        Self {
            id: RuleId(id),
            resource,
            scope,
            operation,
        }
    }

    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.resource, self.scope, self.operation)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.key())
    }
}

/// A collaboration and the organizations taking part in it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Collaboration {
    pub id: CollaborationId,
    pub name: String,
    pub organization_ids: Vec<OrganizationId>,
}

impl Collaboration {
    /// Check if an organization takes part in this collaboration
    pub fn includes(&self, organization_id: OrganizationId) -> bool {
        self.organization_ids.contains(&organization_id)
    }
}
