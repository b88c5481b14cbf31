//! Testes do fluxo pedido -> aprovação -> atribuição contra o ledger em memória

mod common;

use assetverse::{
    common::error::{AppError, RejectionReason},
    models::{asset::AssignmentStatus, request::{ProcessAction, RequestStatus}},
    services::workflow_service::ProcessOutcome,
};
use common::{identity, TestApp};
use uuid::Uuid;

const HR: &str = "rh@acme.com";

fn assert_rejected(result: Result<impl std::fmt::Debug, AppError>, expected: RejectionReason) {
    match result {
        Err(AppError::BusinessRejected(reason)) => assert_eq!(reason, expected),
        other => panic!("esperava BusinessRejected({:?}), veio {:?}", expected, other),
    }
}

#[tokio::test]
async fn approval_decrements_stock_and_creates_assignment() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 3).await;

    let request_id = app.submit(&ana, &laptop, HR).await;
    let outcome = app
        .state
        .workflow_service
        .process_request(&hr, request_id, ProcessAction::Approve)
        .await
        .unwrap();

    let ProcessOutcome::Approved { assignment_id, affiliation_created } = outcome else {
        panic!("esperava aprovação");
    };
    assert!(affiliation_created);

    assert_eq!(app.asset(laptop.id).await.quantity, 2);

    let assignments = app.assignments_for(laptop.id).await;
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].id, assignment_id);
    assert_eq!(assignments[0].employee_email, "ana@mail.com");
    assert_eq!(assignments[0].hr_email, HR);
    assert_eq!(assignments[0].status, AssignmentStatus::Assigned);

    let request = app.request(request_id).await;
    assert_eq!(request.request_status, RequestStatus::Approved);
    assert_eq!(request.processed_by.as_deref(), Some(HR));
    assert!(request.approval_date.is_some());

    assert_eq!(app.user(HR).await.current_employees, 1);
    assert_eq!(app.affiliation_count("ana@mail.com", HR).await, 1);
}

#[tokio::test]
async fn seat_limit_rejects_and_leaves_request_pending() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 1).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let bruno = app.register_employee("bruno@mail.com", "Bruno").await;
    let laptop = app.create_asset(&hr, "Laptop", 5).await;

    // Ana ocupa a única vaga
    let first = app.submit(&ana, &laptop, HR).await;
    app.state
        .workflow_service
        .process_request(&hr, first, ProcessAction::Approve)
        .await
        .unwrap();

    let second = app.submit(&bruno, &laptop, HR).await;
    let result = app
        .state
        .workflow_service
        .process_request(&hr, second, ProcessAction::Approve)
        .await;
    assert_rejected(result, RejectionReason::SeatLimitExceeded);

    assert_eq!(app.request(second).await.request_status, RequestStatus::Pending);
    assert_eq!(app.asset(laptop.id).await.quantity, 4);
    assert_eq!(app.user(HR).await.current_employees, 1);
    assert_eq!(app.affiliation_count("bruno@mail.com", HR).await, 0);
    assert_eq!(app.assignments_for(laptop.id).await.len(), 1);

    // Ainda pendente: o RH pode rejeitar explicitamente
    let outcome = app
        .state
        .workflow_service
        .process_request(&hr, second, ProcessAction::Reject)
        .await
        .unwrap();
    assert_eq!(outcome, ProcessOutcome::Rejected);
}

#[tokio::test]
async fn reject_touches_only_the_request() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 3).await;

    let request_id = app.submit(&ana, &laptop, HR).await;
    let outcome = app
        .state
        .workflow_service
        .process_request(&hr, request_id, ProcessAction::Reject)
        .await
        .unwrap();
    assert_eq!(outcome, ProcessOutcome::Rejected);

    let request = app.request(request_id).await;
    assert_eq!(request.request_status, RequestStatus::Rejected);
    assert!(request.approval_date.is_some());
    assert_eq!(request.processed_by.as_deref(), Some(HR));

    assert_eq!(app.asset(laptop.id).await.quantity, 3);
    assert!(app.assignments_for(laptop.id).await.is_empty());
    assert_eq!(app.affiliation_count("ana@mail.com", HR).await, 0);
    assert_eq!(app.user(HR).await.current_employees, 0);
}

#[tokio::test]
async fn existing_affiliation_skips_seat_check() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 1).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 5).await;

    let first = app.submit(&ana, &laptop, HR).await;
    app.state
        .workflow_service
        .process_request(&hr, first, ProcessAction::Approve)
        .await
        .unwrap();
    assert_eq!(app.user(HR).await.current_employees, 1);

    // Pacote cheio, mas Ana já está afiliada
    let second = app.submit(&ana, &laptop, HR).await;
    let outcome = app
        .state
        .workflow_service
        .process_request(&hr, second, ProcessAction::Approve)
        .await
        .unwrap();

    assert!(matches!(outcome, ProcessOutcome::Approved { affiliation_created: false, .. }));
    assert_eq!(app.user(HR).await.current_employees, 1);
    assert_eq!(app.affiliation_count("ana@mail.com", HR).await, 1);
    assert_eq!(app.asset(laptop.id).await.quantity, 3);
    assert_eq!(app.assignments_for(laptop.id).await.len(), 2);
}

#[tokio::test]
async fn processing_twice_is_a_conflict() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 3).await;

    let request_id = app.submit(&ana, &laptop, HR).await;
    let workflow = &app.state.workflow_service;
    workflow.process_request(&hr, request_id, ProcessAction::Approve).await.unwrap();

    for action in [ProcessAction::Approve, ProcessAction::Reject] {
        let result = workflow.process_request(&hr, request_id, action).await;
        assert!(matches!(result, Err(AppError::RequestAlreadyProcessed)));
    }

    // Nenhum efeito colateral repetido
    assert_eq!(app.asset(laptop.id).await.quantity, 2);
    assert_eq!(app.assignments_for(laptop.id).await.len(), 1);
    assert_eq!(app.request(request_id).await.request_status, RequestStatus::Approved);
}

#[tokio::test]
async fn only_the_addressed_hr_can_process() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let other_hr = app.register_hr("rh@globex.com", "Globex", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 3).await;

    let request_id = app.submit(&ana, &laptop, HR).await;
    let workflow = &app.state.workflow_service;

    let result = workflow.process_request(&other_hr, request_id, ProcessAction::Approve).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    let result = workflow.process_request(&ana, request_id, ProcessAction::Approve).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    assert_eq!(app.request(request_id).await.request_status, RequestStatus::Pending);
    assert_eq!(app.asset(laptop.id).await.quantity, 3);
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;

    let result = app
        .state
        .workflow_service
        .process_request(&hr, Uuid::new_v4(), ProcessAction::Approve)
        .await;
    assert!(matches!(result, Err(AppError::RequestNotFound)));
}

#[tokio::test]
async fn stock_is_checked_before_seats() {
    let app = TestApp::new();
    // Sem vagas e sem estoque: vence a regra do estoque
    let hr = app.register_hr(HR, "Acme", 0).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 0).await;

    let request_id = app.submit(&ana, &laptop, HR).await;
    let result = app
        .state
        .workflow_service
        .process_request(&hr, request_id, ProcessAction::Approve)
        .await;
    assert_rejected(result, RejectionReason::AssetUnavailable);
    assert_eq!(app.request(request_id).await.request_status, RequestStatus::Pending);
}

#[tokio::test]
async fn approving_a_foreign_asset_is_rejected() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let globex = app.register_hr("rh@globex.com", "Globex", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let foreign = app.create_asset(&globex, "Projetor", 2).await;

    // Pedido endereçado à Acme para um ativo da Globex
    let request_id = app.submit(&ana, &foreign, HR).await;
    let result = app
        .state
        .workflow_service
        .process_request(&hr, request_id, ProcessAction::Approve)
        .await;
    assert_rejected(result, RejectionReason::AssetNotOwned);
    assert_eq!(app.asset(foreign.id).await.quantity, 2);
}

#[tokio::test]
async fn submit_normalizes_hr_email() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 1).await;

    let request_id = app.submit(&ana, &laptop, "  RH@Acme.com ").await;
    assert_eq!(app.request(request_id).await.hr_email, HR);

    let outcome = app
        .state
        .workflow_service
        .process_request(&hr, request_id, ProcessAction::Approve)
        .await
        .unwrap();
    assert!(matches!(outcome, ProcessOutcome::Approved { .. }));
}

#[tokio::test]
async fn direct_assignment_requires_affiliation_ownership_and_stock() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let globex = app.register_hr("rh@globex.com", "Globex", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 3).await;
    let empty = app.create_asset(&hr, "Mouse", 0).await;
    let foreign = app.create_asset(&globex, "Projetor", 3).await;
    let workflow = &app.state.workflow_service;

    // Ainda não afiliada
    let result = workflow.assign_asset_direct(&hr, "ana@mail.com", laptop.id).await;
    assert_rejected(result, RejectionReason::NotAffiliated);

    // A aprovação cria a afiliação
    let request_id = app.submit(&ana, &laptop, HR).await;
    workflow.process_request(&hr, request_id, ProcessAction::Approve).await.unwrap();
    assert_eq!(app.asset(laptop.id).await.quantity, 2);

    let assignment = workflow
        .assign_asset_direct(&hr, "Ana@Mail.com", laptop.id)
        .await
        .unwrap();
    assert_eq!(assignment.employee_email, "ana@mail.com");
    assert_eq!(assignment.employee_name, "Ana");
    assert_eq!(assignment.company_name, "Acme");
    assert_eq!(app.asset(laptop.id).await.quantity, 1);

    let result = workflow.assign_asset_direct(&hr, "ana@mail.com", foreign.id).await;
    assert_rejected(result, RejectionReason::AssetNotOwned);

    let result = workflow.assign_asset_direct(&hr, "ana@mail.com", Uuid::new_v4()).await;
    assert_rejected(result, RejectionReason::AssetNotOwned);

    let result = workflow.assign_asset_direct(&hr, "ana@mail.com", empty.id).await;
    assert_rejected(result, RejectionReason::AssetUnavailable);

    // Funcionário não atribui ativos
    let result = workflow.assign_asset_direct(&ana, "ana@mail.com", laptop.id).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    // Seats são contados só pela aprovação
    assert_eq!(app.user(HR).await.current_employees, 1);
}

#[tokio::test]
async fn return_restores_stock_once() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let intruso = identity("intruso@mail.com", "Intruso");
    let laptop = app.create_asset(&hr, "Laptop", 1).await;
    let workflow = &app.state.workflow_service;

    let request_id = app.submit(&ana, &laptop, HR).await;
    let ProcessOutcome::Approved { assignment_id, .. } = workflow
        .process_request(&hr, request_id, ProcessAction::Approve)
        .await
        .unwrap()
    else {
        panic!("esperava aprovação");
    };
    assert_eq!(app.asset(laptop.id).await.quantity, 0);

    let result = workflow.return_assignment(&intruso, assignment_id).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    let returned = workflow.return_assignment(&ana, assignment_id).await.unwrap();
    assert_eq!(returned.status, AssignmentStatus::Returned);
    assert!(returned.return_date.is_some());
    assert_eq!(app.asset(laptop.id).await.quantity, 1);

    let result = workflow.return_assignment(&hr, assignment_id).await;
    assert!(matches!(result, Err(AppError::AssignmentAlreadyReturned)));
    assert_eq!(app.asset(laptop.id).await.quantity, 1);

    let result = workflow.return_assignment(&ana, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::AssignmentNotFound)));
}

#[tokio::test]
async fn stock_equals_initial_minus_open_assignments() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let bruno = app.register_employee("bruno@mail.com", "Bruno").await;
    let initial = 4;
    let laptop = app.create_asset(&hr, "Laptop", initial).await;
    let workflow = &app.state.workflow_service;

    for employee in [&ana, &bruno] {
        let request_id = app.submit(employee, &laptop, HR).await;
        workflow.process_request(&hr, request_id, ProcessAction::Approve).await.unwrap();
    }
    let direct = workflow.assign_asset_direct(&hr, "bruno@mail.com", laptop.id).await.unwrap();
    workflow.return_assignment(&bruno, direct.id).await.unwrap();

    let open = app
        .assignments_for(laptop.id)
        .await
        .iter()
        .filter(|a| a.status == AssignmentStatus::Assigned)
        .count() as i32;
    assert_eq!(open, 2);
    assert_eq!(app.asset(laptop.id).await.quantity, initial - open);
}

#[tokio::test]
async fn requests_are_listed_per_tenant_newest_first() {
    let app = TestApp::new();
    let hr = app.register_hr(HR, "Acme", 5).await;
    let globex = app.register_hr("rh@globex.com", "Globex", 5).await;
    let ana = app.register_employee("ana@mail.com", "Ana").await;
    let laptop = app.create_asset(&hr, "Laptop", 3).await;

    let older = app.submit(&ana, &laptop, HR).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = app.submit(&ana, &laptop, HR).await;

    let workflow = &app.state.workflow_service;
    let listed: Vec<Uuid> = workflow
        .list_requests_for_tenant(&hr)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec![newer, older]);

    assert!(workflow.list_requests_for_tenant(&globex).await.unwrap().is_empty());

    // Solicitante e RH enxergam o pedido; terceiros não
    assert!(workflow.get_request(&ana, older).await.is_ok());
    assert!(workflow.get_request(&hr, older).await.is_ok());
    assert!(matches!(workflow.get_request(&globex, older).await, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn duplicate_registration_keeps_existing_record() {
    let app = TestApp::new();
    app.register_hr(HR, "Acme", 3).await;

    let result = app
        .state
        .user_service
        .register(
            &identity(HR, "Outro"),
            assetverse::services::user_service::RegisterInput {
                role: assetverse::models::user::UserRole::Employee,
                company_name: None,
                company_logo: None,
                package_limit: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::EmailAlreadyExists)));

    let user = app.user(HR).await;
    assert!(user.is_hr());
    assert_eq!(user.package_limit, 3);
    assert_eq!(user.company_name.as_deref(), Some("Acme"));
}
