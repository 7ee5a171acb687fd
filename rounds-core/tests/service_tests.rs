//! Access-controlled query layer: scope containment, deletion
//! preconditions, impersonation equivalence, and best-effort auditing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use rounds_core::{
    AuditEntry, AuditSink, AuthContext, CoreError, CreateOnDemand,
    DirectoryStore, InspectionService, InstanceStore, ReportStore, Result,
    Scope, resolve_scope,
};
use rounds_model::{InspectionStatus, Role};

#[path = "support/mod.rs"]
mod support;

use support::{Tenant, World, anchor};

fn admin_ctx(tenant: &Tenant) -> AuthContext {
    AuthContext {
        inspector_id: tenant.admin.id,
        role: Role::Admin,
        organization_id: Some(tenant.org.id),
        area_id: None,
    }
}

async fn seed_swept_instance(world: &World, tenant: &Tenant) -> rounds_model::InspectionInstance {
    world
        .seed_weekly_template(tenant, Some(&tenant.inspector))
        .await;
    let outcome = world.service.scheduler().run_sweep(anchor()).await.unwrap();
    outcome.created.into_iter().next().unwrap()
}

#[tokio::test]
async fn admin_listing_never_crosses_organizations() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let globex = world.seed_tenant("globex").await;
    seed_swept_instance(&world, &acme).await;
    seed_swept_instance(&world, &globex).await;

    let listed = world
        .service
        .list(&Scope::Organization(acme.org.id))
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].instance.department_id, acme.department.id);
}

#[tokio::test]
async fn mini_admin_listing_is_confined_to_their_area() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    // A second area and department inside the same organization.
    let other_area = world
        .store
        .create_area(rounds_model::CreateArea {
            name: "acme annex".to_string(),
            organization_id: acme.org.id,
        })
        .await
        .unwrap();
    let other_department = world
        .store
        .create_department(rounds_model::CreateDepartment {
            name: "annex department".to_string(),
            area_id: other_area.id,
        })
        .await
        .unwrap();
    let template = world
        .store
        .create_template(rounds_model::CreateTemplate {
            organization_id: acme.org.id,
            name: "Dual site check".to_string(),
            description: None,
            items: vec![],
            recurrence: Some(rounds_model::RecurrencePolicy {
                cadence: rounds_model::Cadence::Weeks(1),
                assignments: vec![
                    rounds_model::TemplateAssignment {
                        department_id: acme.department.id,
                        default_inspector_id: Some(acme.inspector.id),
                    },
                    rounds_model::TemplateAssignment {
                        department_id: other_department.id,
                        default_inspector_id: Some(acme.inspector.id),
                    },
                ],
            }),
        })
        .await
        .unwrap();
    assert!(template.recurrence.is_some());
    world.service.scheduler().run_sweep(anchor()).await.unwrap();

    let listed = world.service.list(&Scope::Area(acme.area.id)).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].instance.department_id, acme.department.id);
}

#[tokio::test]
async fn impersonation_matches_the_real_admin_byte_for_byte() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let globex = world.seed_tenant("globex").await;
    seed_swept_instance(&world, &acme).await;
    seed_swept_instance(&world, &globex).await;

    let super_ctx = AuthContext {
        inspector_id: rounds_model::InspectorId::new(),
        role: Role::SuperAdmin,
        organization_id: None,
        area_id: None,
    };
    let impersonated =
        resolve_scope(&super_ctx, Some(acme.org.id)).unwrap();
    let own = resolve_scope(&admin_ctx(&acme), None).unwrap();

    let via_super = world.service.list(&impersonated).await.unwrap();
    let via_admin = world.service.list(&own).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&via_super).unwrap(),
        serde_json::to_vec(&via_admin).unwrap()
    );
}

#[tokio::test]
async fn unscoped_listing_is_denied_but_stats_are_served() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let globex = world.seed_tenant("globex").await;
    seed_swept_instance(&world, &acme).await;
    seed_swept_instance(&world, &globex).await;

    assert!(matches!(
        world.service.list(&Scope::AllOrganizations).await,
        Err(CoreError::AccessDenied(_))
    ));

    let counts = world
        .service
        .stats(&Scope::AllOrganizations)
        .await
        .unwrap();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.due_soon, 2);
}

#[tokio::test]
async fn listing_orders_by_status_priority_then_due_date() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let template = world
        .seed_weekly_template(&acme, Some(&acme.inspector))
        .await;
    let scope = Scope::Organization(acme.org.id);
    let scheduler = world.service.scheduler();

    let overdue = scheduler
        .create_instance(
            template.id,
            acme.department.id,
            acme.inspector.id,
            Some(anchor().date_naive() - Duration::days(2)),
        )
        .await
        .unwrap();
    let due_soon = scheduler
        .create_instance(
            template.id,
            acme.department.id,
            acme.inspector.id,
            Some(anchor().date_naive() + Duration::days(1)),
        )
        .await
        .unwrap();
    let pending = scheduler
        .create_instance(
            template.id,
            acme.department.id,
            acme.inspector.id,
            Some(anchor().date_naive() + Duration::days(30)),
        )
        .await
        .unwrap();
    let completed = scheduler
        .create_instance(
            template.id,
            acme.department.id,
            acme.inspector.id,
            Some(anchor().date_naive() + Duration::days(40)),
        )
        .await
        .unwrap();
    world
        .service
        .complete(&scope, completed.id, acme.admin.id)
        .await
        .unwrap();

    let listed = world.service.list(&scope).await.unwrap();

    let ids: Vec<_> = listed.iter().map(|i| i.instance.id).collect();
    assert_eq!(ids, vec![overdue.id, due_soon.id, pending.id, completed.id]);
    assert_eq!(
        listed.iter().map(|i| i.status).collect::<Vec<_>>(),
        vec![
            InspectionStatus::Overdue,
            InspectionStatus::DueSoon,
            InspectionStatus::Pending,
            InspectionStatus::Completed,
        ]
    );
}

#[tokio::test]
async fn delete_is_blocked_once_completed_or_started() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let scope = Scope::Organization(acme.org.id);
    let instance = seed_swept_instance(&world, &acme).await;

    // Recorded progress blocks deletion.
    let report = world
        .store
        .create_report(instance.id, anchor())
        .await
        .unwrap();
    world
        .store
        .add_item(report.id, uuid::Uuid::new_v4(), None, anchor())
        .await
        .unwrap();
    let blocked = world
        .service
        .delete(&scope, instance.id, acme.admin.id)
        .await;
    assert!(matches!(blocked, Err(CoreError::PreconditionFailed(_))));
    assert!(world.store.get(instance.id).await.unwrap().is_some());

    // Completion blocks deletion too, independent of report contents.
    let second = world
        .service
        .scheduler()
        .create_instance(
            instance.template_id,
            acme.department.id,
            acme.inspector.id,
            None,
        )
        .await
        .unwrap();
    world
        .service
        .complete(&scope, second.id, acme.admin.id)
        .await
        .unwrap();
    let blocked = world.service.delete(&scope, second.id, acme.admin.id).await;
    assert!(matches!(blocked, Err(CoreError::PreconditionFailed(_))));
    assert!(world.store.get(second.id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_in_initial_state_succeeds_and_is_audited() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let scope = Scope::Organization(acme.org.id);
    let instance = seed_swept_instance(&world, &acme).await;

    world
        .service
        .delete(&scope, instance.id, acme.admin.id)
        .await
        .unwrap();

    assert!(world.store.get(instance.id).await.unwrap().is_none());
    let entries = world.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "inspection.delete");
    assert_eq!(entries[0].actor_id, acme.admin.id);
    assert_eq!(entries[0].entity_id, instance.id.to_uuid());
}

#[tokio::test]
async fn cross_tenant_delete_reads_as_not_found() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let globex = world.seed_tenant("globex").await;
    let foreign = seed_swept_instance(&world, &globex).await;

    let result = world
        .service
        .delete(&Scope::Organization(acme.org.id), foreign.id, acme.admin.id)
        .await;

    assert!(matches!(result, Err(CoreError::NotFound(_))));
    assert!(world.store.get(foreign.id).await.unwrap().is_some());
}

#[tokio::test]
async fn create_on_demand_respects_scope_and_role() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let globex = world.seed_tenant("globex").await;
    let template = world
        .seed_weekly_template(&acme, Some(&acme.inspector))
        .await;
    let params = CreateOnDemand {
        template_id: template.id,
        department_id: acme.department.id,
        inspector_id: acme.inspector.id,
        due_date: None,
    };

    // Identity scopes cannot create.
    let denied = world
        .service
        .create_on_demand(
            &Scope::Inspector(acme.inspector.id),
            acme.inspector.id,
            params.clone(),
        )
        .await;
    assert!(matches!(denied, Err(CoreError::AccessDenied(_))));

    // A foreign organization's scope cannot even see the template.
    let invisible = world
        .service
        .create_on_demand(
            &Scope::Organization(globex.org.id),
            globex.admin.id,
            params.clone(),
        )
        .await;
    assert!(matches!(invisible, Err(CoreError::NotFound(_))));

    // The owning admin succeeds.
    let created = world
        .service
        .create_on_demand(
            &Scope::Organization(acme.org.id),
            acme.admin.id,
            params,
        )
        .await
        .unwrap();
    assert_eq!(created.department_id, acme.department.id);
}

#[tokio::test]
async fn inspectors_complete_only_their_own_assignments() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let instance = seed_swept_instance(&world, &acme).await;

    // Someone else's identity scope cannot find it.
    let stranger = world
        .store
        .create_inspector(rounds_model::CreateInspector {
            display_name: "bystander".to_string(),
            role: Role::Inspector,
            organization_id: Some(acme.org.id),
            area_id: None,
        })
        .await
        .unwrap();
    let result = world
        .service
        .complete(&Scope::Inspector(stranger.id), instance.id, stranger.id)
        .await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    // The assignee completes it; a second completion is refused.
    let done = world
        .service
        .complete(
            &Scope::Inspector(acme.inspector.id),
            instance.id,
            acme.inspector.id,
        )
        .await
        .unwrap();
    assert_eq!(done.status, InspectionStatus::Completed);
    assert!(done.instance.completed_at.is_some());

    let again = world
        .service
        .complete(
            &Scope::Inspector(acme.inspector.id),
            instance.id,
            acme.inspector.id,
        )
        .await;
    assert!(matches!(again, Err(CoreError::PreconditionFailed(_))));
}

/// Audit sink that always fails; mutations must succeed regardless.
struct RefusingAuditSink;

#[async_trait]
impl AuditSink for RefusingAuditSink {
    async fn record(&self, _entry: AuditEntry) -> Result<()> {
        Err(CoreError::Storage("audit store offline".into()))
    }
}

#[tokio::test]
async fn audit_failures_never_block_the_mutation() {
    let world = World::new().await;
    let acme = world.seed_tenant("acme").await;
    let instance = seed_swept_instance(&world, &acme).await;

    let service = InspectionService::new(
        world.store.clone(),
        world.store.clone(),
        world.store.clone(),
        Arc::new(RefusingAuditSink),
        world.clock.clone(),
    );

    service
        .delete(&Scope::Organization(acme.org.id), instance.id, acme.admin.id)
        .await
        .unwrap();
    assert!(world.store.get(instance.id).await.unwrap().is_none());
}
