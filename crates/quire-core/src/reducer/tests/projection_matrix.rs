use std::collections::BTreeMap;

use super::*;
use pretty_assertions::assert_eq;

fn decided(raw_id: &str, entries: &[(&str, RefereeDecision)]) -> DecisionMap {
    DecisionMap::from([(
        id(raw_id),
        entries
            .iter()
            .map(|(referee, decision)| (referee.to_string(), decision.clone()))
            .collect::<BTreeMap<_, _>>(),
    )])
}

#[test]
fn projection_lists_awaiting_referees_and_viewer_decision() {
    let session = session_as(
        Role::Referee,
        vec![manuscript(
            "m1",
            ManuscriptState::InReview,
            &["u1@example.org", "r2"],
        )],
    );
    let decisions = decided("m1", &[("u1@example.org", RefereeDecision::Accept)]);

    let views = project(&session, &decisions);

    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.awaiting, vec!["r2".to_string()]);
    assert_eq!(view.viewer_decision, Some(RefereeDecision::Accept));
    assert!(view.review_complete);
    assert!(view.can_act);
    assert_eq!(view.available.len(), 4);
}

#[test]
fn projection_without_referees_is_never_complete() {
    let session = session_as(
        Role::Editor,
        vec![manuscript("m1", ManuscriptState::CopyEditing, &[])],
    );

    let view = &project(&session, &DecisionMap::new())[0];

    assert!(!view.review_complete);
    assert!(!view.can_act);
    assert!(view.available.is_empty());
}

#[test]
fn projection_shows_comments_only_when_expanded() {
    let mut session = session_as(
        Role::Editor,
        vec![manuscript("m1", ManuscriptState::InReview, &["r1"])],
    );
    run_runtime(
        &mut session,
        RuntimeAction::CommentsLoaded {
            manuscript_id: id("m1"),
            comments: vec![RawComment {
                text: "Minor typos.".to_string(),
                editor_id: Some("r1".to_string()),
                timestamp: Some("2024-03-01T10:00:00Z".to_string()),
            }],
        },
    );

    let collapsed = &project(&session, &DecisionMap::new())[0];
    assert_eq!(collapsed.comment_count, 1);
    assert!(collapsed.comments.is_empty());
    assert!(collapsed.review_complete);

    run_user(&mut session, UserAction::ToggleExpanded(id("m1")));
    let expanded = &project(&session, &DecisionMap::new())[0];
    assert_eq!(expanded.comments.len(), 1);
    assert_eq!(expanded.comments[0].author, "r1");
}

#[test]
fn pending_operation_disables_controls_in_projection() {
    let mut session = session_as(
        Role::Editor,
        vec![manuscript("m1", ManuscriptState::EditorReview, &["r1"])],
    );
    select(&mut session, "m1", ActorDecision::Accept);
    submit(&mut session, "m1");

    let view = &project(&session, &DecisionMap::new())[0];

    assert!(view.pending);
    assert!(!view.can_act);
    assert!(view.review_complete);
}
