// ABOUTME: End-to-end lifecycle test for the workflow engine
// ABOUTME: Create, approve, execute, refuse, re-approve, complete, close

use std::sync::Arc;

use chrono::{DateTime, Utc};

use guichet_core::{Actor, RequestType, Role, StatusKind};
use guichet_notify::test_utils::RecordingDispatcher;
use guichet_notify::EventKind;
use guichet_registry::ReferenceStorage;
use guichet_storage::{connect, StorageConfig};
use guichet_tickets::{ReportKind, ReportStorage, TicketCreateInput, TicketStorage};
use guichet_workflow::{ApprovalInput, WorkflowEngine};

const REQUESTER_ID: i64 = 42;
const EXECUTANT_ID: i64 = 7;
const SERVICE_ID: i64 = 3;

fn date(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

async fn seed(pool: &sqlx::SqlitePool) {
    let registry = ReferenceStorage::new(pool.clone());
    registry.seed_defaults().await.unwrap();

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO services (id, designation, is_active, created_at, updated_at) VALUES (?, 'Informatique', TRUE, ?, ?)",
    )
    .bind(SERVICE_ID)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO demandeurs (id, designation, email, service_id, is_active, created_at, updated_at)
         VALUES (?, 'Marie Curie', 'marie@exemple.fr', ?, TRUE, ?, ?)",
    )
    .bind(REQUESTER_ID)
    .bind(SERVICE_ID)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO executants (id, designation, email, is_active, created_at, updated_at)
         VALUES (?, 'Jean Technicien', 'jean@exemple.fr', TRUE, ?, ?)",
    )
    .bind(EXECUTANT_ID)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn full_ticket_lifecycle_with_refusal_and_final_close() {
    let pool = connect(&StorageConfig::in_memory()).await.unwrap();
    seed(&pool).await;

    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = WorkflowEngine::new(pool.clone(), dispatcher.clone(), "astreinte@guichet.local");
    let tickets = TicketStorage::new(pool.clone());
    let reports = ReportStorage::new(pool.clone());
    let registry = ReferenceStorage::new(pool.clone());

    let requester = Actor::new(REQUESTER_ID, Role::Requester);
    let admin = Actor::new(1, Role::Admin);
    let executant = Actor::new(EXECUTANT_ID, Role::Executant);

    // Requester opens the ticket.
    let ticket = engine
        .create_ticket(
            &requester,
            TicketCreateInput {
                title: "Poste de travail hors service".to_string(),
                description: "Écran noir au démarrage".to_string(),
                request_type: Some(RequestType::Incident),
                demandeur_id: REQUESTER_ID,
                societe_id: None,
                service_id: Some(SERVICE_ID),
                attachment_paths: None,
            },
        )
        .await
        .unwrap();
    assert!(ticket.actual_end_date.is_none());

    // Admin schedules the work and assigns the executant.
    engine
        .approve(
            &admin,
            ticket.id,
            ApprovalInput {
                start_date: date("2024-01-05T08:00:00Z"),
                expected_end_date: date("2024-01-10T17:00:00Z"),
                executant_id: EXECUTANT_ID,
                priority_id: None,
                location_id: None,
                category_id: None,
            },
        )
        .await
        .unwrap();

    // Executant works the ticket to completion.
    engine
        .progress(&executant, ticket.id, StatusKind::InProgress)
        .await
        .unwrap();
    engine
        .progress(&executant, ticket.id, StatusKind::Completed)
        .await
        .unwrap();

    // Requester is not satisfied: the ticket bounces back into the queue.
    let reopened = engine
        .reopen(&requester, ticket.id, "L'écran reste noir après redémarrage")
        .await
        .unwrap();
    assert!(reopened.actual_end_date.is_none());

    let filed = reports.list_by_ticket(ticket.id).await.unwrap();
    assert_eq!(filed.len(), 1);
    assert_eq!(filed[0].kind, ReportKind::Rejection);
    assert_eq!(filed[0].author_id, REQUESTER_ID);

    // Admin re-approves with a fresh schedule.
    engine
        .approve(
            &admin,
            ticket.id,
            ApprovalInput {
                start_date: date("2024-01-11T08:00:00Z"),
                expected_end_date: date("2024-01-12T17:00:00Z"),
                executant_id: EXECUTANT_ID,
                priority_id: None,
                location_id: None,
                category_id: None,
            },
        )
        .await
        .unwrap();

    // Second pass succeeds and the requester signs off.
    engine
        .progress(&executant, ticket.id, StatusKind::Completed)
        .await
        .unwrap();
    let closed = engine.close(&requester, ticket.id).await.unwrap();

    let stamped = closed.actual_end_date.expect("stamped on close");
    assert_eq!(
        registry.status_kind(closed.status_id).await.unwrap(),
        Some(StatusKind::Closed)
    );
    assert_eq!(closed.start_date, Some(date("2024-01-11T08:00:00Z")));

    // The stamp survives later reads untouched.
    let reread = tickets.get_ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(reread.actual_end_date, Some(stamped));

    // The requester reviews the rejection report trail.
    let flipped = engine.mark_reports_viewed(&requester, ticket.id).await.unwrap();
    assert_eq!(flipped, 1);

    // Notification trail: two assignments, one reopening, one closing.
    let kinds: Vec<EventKind> = dispatcher.events().iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::TicketAssigned,
            EventKind::TicketReopened,
            EventKind::TicketAssigned,
            EventKind::TicketClosed,
        ]
    );
}
