//! Shared fixtures: a fully in-memory stack with a deterministic clock
//! and one seeded tenant (organization → area → department → people).

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use rounds_core::{
    DirectoryStore, FixedClock, InspectionService, MemoryAuditSink,
    MemoryStore,
};
use rounds_model::{
    Area, Cadence, ChecklistItem, CreateArea, CreateDepartment,
    CreateInspector, CreateOrganization, CreateTemplate, Department,
    Inspector, MasterTemplate, Organization, RecurrencePolicy, Role,
    TemplateAssignment,
};
use uuid::Uuid;

/// Monday 2024-01-08, noon UTC. All tests reason relative to this.
pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap()
}

pub struct Tenant {
    pub org: Organization,
    pub area: Area,
    pub department: Department,
    pub admin: Inspector,
    pub inspector: Inspector,
}

pub struct World {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub clock: Arc<FixedClock>,
    pub service: InspectionService,
}

impl World {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let clock = Arc::new(FixedClock::new(anchor()));
        let service = InspectionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            audit.clone(),
            clock.clone(),
        );
        Self {
            store,
            audit,
            clock,
            service,
        }
    }

    pub async fn seed_tenant(&self, name: &str) -> Tenant {
        let org = self
            .store
            .create_organization(CreateOrganization {
                name: name.to_string(),
            })
            .await
            .unwrap();
        let area = self
            .store
            .create_area(CreateArea {
                name: format!("{name} area"),
                organization_id: org.id,
            })
            .await
            .unwrap();
        let department = self
            .store
            .create_department(CreateDepartment {
                name: format!("{name} department"),
                area_id: area.id,
            })
            .await
            .unwrap();
        let admin = self
            .store
            .create_inspector(CreateInspector {
                display_name: format!("{name} admin"),
                role: Role::Admin,
                organization_id: Some(org.id),
                area_id: None,
            })
            .await
            .unwrap();
        let inspector = self
            .store
            .create_inspector(CreateInspector {
                display_name: format!("{name} inspector"),
                role: Role::Inspector,
                organization_id: Some(org.id),
                area_id: None,
            })
            .await
            .unwrap();
        Tenant {
            org,
            area,
            department,
            admin,
            inspector,
        }
    }

    /// A weekly template for the tenant's department, optionally with a
    /// default inspector for sweep assignment.
    pub async fn seed_weekly_template(
        &self,
        tenant: &Tenant,
        default_inspector: Option<&Inspector>,
    ) -> MasterTemplate {
        self.store
            .create_template(CreateTemplate {
                organization_id: tenant.org.id,
                name: "Fire safety".to_string(),
                description: Some("Weekly fire safety walk".to_string()),
                items: vec![
                    ChecklistItem {
                        id: Uuid::new_v4(),
                        position: 1,
                        prompt: "Extinguishers charged".to_string(),
                    },
                    ChecklistItem {
                        id: Uuid::new_v4(),
                        position: 2,
                        prompt: "Exits unobstructed".to_string(),
                    },
                ],
                recurrence: Some(RecurrencePolicy {
                    cadence: Cadence::Weeks(1),
                    assignments: vec![TemplateAssignment {
                        department_id: tenant.department.id,
                        default_inspector_id: default_inspector.map(|i| i.id),
                    }],
                }),
            })
            .await
            .unwrap()
    }
}
