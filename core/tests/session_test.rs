//! Session lifecycle and client tests against the JSON fixture

use anyhow::Result;
use console_core::api::{FixtureData, PermissionApi, RuleFilter, StaticApi};
use console_core::{
    Client, Error, Operation, OrganizationId, Requirement, Resource, RoleId, RuleId, RuleKey,
    Scope, SessionContext,
};

const FIXTURE: &str = include_str!("fixtures/console.json");

fn client() -> Client {
    Client::with_api(Box::new(StaticApi::from_json(FIXTURE).unwrap()))
}

#[tokio::test]
async fn test_session_derives_shared_organizations_from_collaborations() -> Result<()> {
    let api = StaticApi::from_json(FIXTURE)?;
    let mut context = SessionContext::new();
    let session = context.login(&api).await?;

    assert_eq!(session.catalog.len(), 33);
    assert_eq!(session.active.organization_id, OrganizationId(5));
    assert_eq!(session.active.rules.len(), 19);

    // Collaborations 1 and 2 include organization 5, collaboration 3 does not
    for org in [5, 7, 8] {
        assert!(session.active.shares_collaboration_with(OrganizationId(org)));
    }
    assert!(!session.active.shares_collaboration_with(OrganizationId(9)));

    println!("✓ Shared organizations derived from collaborations");
    Ok(())
}

#[tokio::test]
async fn test_precomputed_shared_organizations_are_used() -> Result<()> {
    let mut data: FixtureData = serde_json::from_str(FIXTURE)?;
    data.user.shared_organizations = Some(vec![OrganizationId(5), OrganizationId(42)]);
    data.collaborations.clear();

    let mut context = SessionContext::new();
    let session = context.login(&StaticApi::new(data)).await?;

    assert!(session.active.shares_collaboration_with(OrganizationId(42)));
    assert!(!session.active.shares_collaboration_with(OrganizationId(7)));
    Ok(())
}

#[tokio::test]
async fn test_logout_fails_closed() -> Result<()> {
    let mut client = client();
    assert!(!client.evaluator().is_allowed(Scope::Any, Resource::User, Operation::View));

    client.login("org-admin", "secret").await?;
    assert!(client.is_authenticated());
    assert!(client.evaluator().is_allowed(Scope::Own, Resource::User, Operation::View));

    client.logout();
    assert!(!client.is_authenticated());
    assert!(client.session().is_none());
    assert!(!client.evaluator().is_allowed(Scope::Own, Resource::User, Operation::View));
    assert!(!client
        .evaluator()
        .is_allowed_for_organization(Resource::User, Operation::View, Some(OrganizationId(5))));
    assert!(matches!(client.rules(RuleFilter::All).await, Err(Error::NotAuthenticated)));

    println!("✓ Logged-out client denies everything");
    Ok(())
}

#[tokio::test]
async fn test_failed_login_leaves_client_logged_out() -> Result<()> {
    let mut client = client();
    client.login("org-admin", "secret").await?;

    let result = client.login("somebody-else", "secret").await;
    assert!(result.is_err());
    assert!(!client.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn test_guard_requirements() -> Result<()> {
    let mut client = client();
    client.login("org-admin", "secret").await?;
    let eval = client.evaluator();

    // Organization-level user management
    assert!(eval.satisfies(&Requirement::new(Resource::User, Operation::Edit, Scope::Organization)));
    // Task creation is granted at collaboration level, which satisfies an "own" requirement
    assert!(eval.satisfies(&Requirement::new(Resource::Task, Operation::Create, Scope::Own)));
    // Nothing global beyond viewing rules
    assert!(!eval.satisfies(&Requirement::new(Resource::Node, Operation::View, Scope::Global)));
    assert!(eval.satisfies(&Requirement::new(Resource::Rule, Operation::View, Scope::Global)));

    assert_eq!(
        eval.allowed_organizations(
            Resource::Task,
            Operation::Create,
            &[OrganizationId(5), OrganizationId(7), OrganizationId(8), OrganizationId(9)]
        ),
        vec![OrganizationId(5), OrganizationId(7), OrganizationId(8)]
    );
    Ok(())
}

#[tokio::test]
async fn test_collaboration_checks_use_fetched_collaboration() -> Result<()> {
    let mut client = client();
    client.login("org-admin", "secret").await?;

    let trial = client.collaboration(console_core::CollaborationId(1)).await?;
    let unrelated = client.collaboration(console_core::CollaborationId(3)).await?;
    let eval = client.evaluator();

    assert!(eval.is_allowed_for_collaboration(Resource::Task, Operation::Create, Some(&trial)));
    assert!(!eval.is_allowed_for_collaboration(Resource::Task, Operation::Create, Some(&unrelated)));
    Ok(())
}

#[tokio::test]
async fn test_role_editor_round_trip() -> Result<()> {
    let mut client = client();
    client.login("org-admin", "secret").await?;

    let matrix = client.open_role_editor(RoleId(3)).await?;
    let preselected: Vec<RuleId> = matrix.selected_rule_ids();
    // The actor holds every researcher rule at sufficient scope
    assert_eq!(preselected, vec![RuleId(24), RuleId(25), RuleId(26), RuleId(29)]);

    // Cannot hand out global task viewing: shown as fixed, unselected
    let global_task_view = RuleKey::new(Resource::Task, Scope::Global, Operation::View);
    assert!(matches!(client.toggle(global_task_view), Err(Error::CellNotEditable(_))));

    // Dropping collaboration-level task view also drops task creation
    let task_view = RuleKey::new(Resource::Task, Scope::Collaboration, Operation::View);
    let rules = client.toggle(task_view)?;
    let ids: Vec<RuleId> = rules.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RuleId(24), RuleId(29)]);

    let changes = client.editor_changes()?;
    assert!(changes.added.is_empty());
    let removed: Vec<RuleId> = changes.removed.iter().map(|r| r.id).collect();
    assert_eq!(removed, vec![RuleId(25), RuleId(26)]);

    client.reset_editor()?;
    assert!(client.editor_changes()?.is_empty());

    client.logout();
    assert!(client.editor().is_none());
    Ok(())
}

#[tokio::test]
async fn test_root_role_shows_unassignable_grants_as_fixed() -> Result<()> {
    let mut client = client();
    client.login("org-admin", "secret").await?;

    let matrix = client.open_role_editor(RoleId(5)).await?;
    // Every rule of the root role is beyond an organization admin, yet stays on
    assert_eq!(matrix.selected_rules().len(), 9);
    assert!(matrix.selection().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_static_api_rejects_unknown_role() {
    let api = StaticApi::from_json(FIXTURE).unwrap();
    let result = api.fetch_rules(RuleFilter::Role(RoleId(99))).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_fixture_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.json");
    std::fs::write(&path, FIXTURE).unwrap();

    let api = StaticApi::load(&path).unwrap();
    assert_eq!(api.data().roles.len(), 3);
}

#[tokio::test]
async fn test_resume_and_install_reuse_api_credentials() -> Result<()> {
    let api = StaticApi::from_json(FIXTURE)?;
    let session = console_core::Session::establish(&api).await?;

    let mut context = SessionContext::new();
    assert!(context.catalog().is_none());
    context.install(session);
    assert_eq!(context.catalog().map(|c| c.len()), Some(33));

    // The fixture API starts out authenticated, so a session can be resumed
    let mut client = client();
    client.resume().await?;
    assert!(client.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn test_update_and_close_editor() -> Result<()> {
    let mut client = client();
    client.login("org-admin", "secret").await?;
    client.open_role_editor(RoleId(3)).await?;

    let catalog = client.session().unwrap().catalog.clone();
    let inputs = console_core::MatrixInputs {
        fixed_selected: vec![],
        selectable: catalog.resolve(&[RuleId(1), RuleId(2)]),
        preselected: catalog.resolve(&[RuleId(2)]),
    };
    let matrix = client.update_editor(inputs)?;
    assert_eq!(matrix.rows().len(), 1);
    // Preselected edit brings its view along
    assert_eq!(matrix.selected_rule_ids(), vec![RuleId(1), RuleId(2)]);
    assert_eq!(client.editor().and_then(|e| e.role_id), Some(RoleId(3)));

    client.close_editor();
    assert!(matches!(client.editor_changes(), Err(Error::NotFound(_))));
    Ok(())
}
