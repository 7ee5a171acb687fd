//! Strongly typed identifiers for every entity in the hierarchy.
//!
//! Each ID wraps a [`Uuid`] (v7, time-ordered) so that identifiers for
//! different entity kinds cannot be confused at compile time.

use uuid::Uuid;

macro_rules! typed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(
    /// Identifier for a tenant-root organization.
    OrganizationId
);
typed_id!(
    /// Identifier for an area within an organization.
    AreaId
);
typed_id!(
    /// Identifier for a department within an area.
    DepartmentId
);
typed_id!(
    /// Identifier for an inspector (user) account.
    InspectorId
);
typed_id!(
    /// Identifier for a master template.
    TemplateId
);
typed_id!(
    /// Identifier for one inspection instance.
    InstanceId
);
typed_id!(
    /// Identifier for an execution report.
    ReportId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_ordered() {
        let a = InstanceId::new();
        let b = InstanceId::new();
        assert_ne!(a, b);
        // v7 UUIDs are time-ordered, so later mints compare greater.
        assert!(b > a);
    }

    #[test]
    fn id_display_round_trips_through_uuid() {
        let id = TemplateId::new();
        let parsed: Uuid = id.to_string().parse().unwrap();
        assert_eq!(parsed, id.to_uuid());
    }
}
