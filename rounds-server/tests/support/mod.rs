//! In-memory application fixture for endpoint tests: real router, real
//! middleware, memory-backed stores, and seeded session tokens.

use std::sync::Arc;

use axum_test::TestServer;
use uuid::Uuid;

use rounds_core::{
    AuthContext, DirectoryStore, InspectionService, MemoryAuditSink,
    MemorySessionStore, MemoryStore, SystemClock,
};
use rounds_model::{
    Area, Cadence, ChecklistItem, CreateArea, CreateDepartment,
    CreateInspector, CreateOrganization, CreateTemplate, Department,
    Inspector, MasterTemplate, Organization, RecurrencePolicy, Role,
    TemplateAssignment,
};
use rounds_server::{AppState, routes};

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<MemorySessionStore>,
}

pub struct TenantHandles {
    pub org: Organization,
    pub area: Area,
    pub department: Department,
    pub admin: Inspector,
    pub inspector: Inspector,
    pub admin_token: String,
    pub inspector_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let service = Arc::new(InspectionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            audit,
            Arc::new(SystemClock),
        ));
        let state = AppState {
            service,
            directory: store.clone(),
            sessions: sessions.clone(),
        };
        let router = routes::create_api_router(state.clone()).with_state(state);
        let server = TestServer::new(router).expect("router builds");
        Self {
            server,
            store,
            sessions,
        }
    }

    /// Provision a super administrator session and return its token.
    pub async fn seed_super_admin(&self) -> String {
        let admin = self
            .store
            .create_inspector(CreateInspector {
                display_name: "root".to_string(),
                role: Role::SuperAdmin,
                organization_id: None,
                area_id: None,
            })
            .await
            .expect("super admin seeds");
        let token = "super-root".to_string();
        self.sessions
            .insert(
                token.clone(),
                AuthContext {
                    inspector_id: admin.id,
                    role: Role::SuperAdmin,
                    organization_id: None,
                    area_id: None,
                },
            )
            .await;
        token
    }

    /// Provision an organization with one area, one department, an admin,
    /// and an inspector, plus sessions for both people.
    pub async fn seed_tenant(&self, name: &str) -> TenantHandles {
        let org = self
            .store
            .create_organization(CreateOrganization {
                name: name.to_string(),
            })
            .await
            .expect("organization seeds");
        let area = self
            .store
            .create_area(CreateArea {
                name: format!("{name} east"),
                organization_id: org.id,
            })
            .await
            .expect("area seeds");
        let department = self
            .store
            .create_department(CreateDepartment {
                name: format!("{name} floor"),
                area_id: area.id,
            })
            .await
            .expect("department seeds");
        let admin = self
            .store
            .create_inspector(CreateInspector {
                display_name: format!("{name} admin"),
                role: Role::Admin,
                organization_id: Some(org.id),
                area_id: None,
            })
            .await
            .expect("admin seeds");
        let inspector = self
            .store
            .create_inspector(CreateInspector {
                display_name: format!("{name} inspector"),
                role: Role::Inspector,
                organization_id: Some(org.id),
                area_id: None,
            })
            .await
            .expect("inspector seeds");

        let admin_token = format!("{name}-admin");
        self.sessions
            .insert(
                admin_token.clone(),
                AuthContext {
                    inspector_id: admin.id,
                    role: Role::Admin,
                    organization_id: Some(org.id),
                    area_id: None,
                },
            )
            .await;
        let inspector_token = format!("{name}-inspector");
        self.sessions
            .insert(
                inspector_token.clone(),
                AuthContext {
                    inspector_id: inspector.id,
                    role: Role::Inspector,
                    organization_id: Some(org.id),
                    area_id: None,
                },
            )
            .await;

        TenantHandles {
            org,
            area,
            department,
            admin,
            inspector,
            admin_token,
            inspector_token,
        }
    }

    /// Weekly recurring template assigned to the tenant's department with
    /// its inspector as the default assignee.
    pub async fn seed_weekly_template(
        &self,
        tenant: &TenantHandles,
    ) -> MasterTemplate {
        self.store
            .create_template(CreateTemplate {
                organization_id: tenant.org.id,
                name: "Fire safety".to_string(),
                description: None,
                items: vec![ChecklistItem {
                    id: Uuid::new_v4(),
                    position: 1,
                    prompt: "Extinguishers charged".to_string(),
                }],
                recurrence: Some(RecurrencePolicy {
                    cadence: Cadence::Weeks(1),
                    assignments: vec![TemplateAssignment {
                        department_id: tenant.department.id,
                        default_inspector_id: Some(tenant.inspector.id),
                    }],
                }),
            })
            .await
            .expect("template seeds")
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
