use super::*;
use crate::state::test_helpers::test_app_state;
use crate::store::StoreError;

fn acting(user_id: &str) -> ActingUser {
    ActingUser { user_id: user_id.into() }
}

fn named(name: &str) -> Json<BoardNameBody> {
    Json(BoardNameBody { name: name.into() })
}

#[test]
fn board_error_to_status_maps_every_variant() {
    assert_eq!(board_error_to_status(BoardError::NotFound("b".into())), StatusCode::NOT_FOUND);
    assert_eq!(board_error_to_status(BoardError::Forbidden), StatusCode::FORBIDDEN);
    assert_eq!(board_error_to_status(BoardError::InvalidName), StatusCode::BAD_REQUEST);
    assert_eq!(board_error_to_status(BoardError::OwnerImmutable), StatusCode::CONFLICT);
    assert_eq!(
        board_error_to_status(BoardError::Store(StoreError::Unavailable)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn invite_body_role_is_optional() {
    let body: InviteMemberBody = serde_json::from_str(r#"{"user_id":"bob"}"#).unwrap();
    assert_eq!(body.user_id, "bob");
    assert!(body.role.is_none());

    let body: InviteMemberBody = serde_json::from_str(r#"{"user_id":"bob","role":"viewer"}"#).unwrap();
    assert_eq!(body.role, Some(BoardRole::Viewer));
}

#[tokio::test]
async fn create_returns_201_and_lists_for_owner() {
    let state = test_app_state();
    let (status, Json(board)) = create_board(State(state.clone()), acting("alice"), named("Roadmap"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let Json(boards) = list_boards(State(state), acting("alice")).await.unwrap();
    assert_eq!(boards, vec![board]);
}

#[tokio::test]
async fn invite_defaults_to_editor() {
    let state = test_app_state();
    let (_, Json(board)) = create_board(State(state.clone()), acting("alice"), named("Roadmap"))
        .await
        .unwrap();

    let body = Json(InviteMemberBody { user_id: "bob".into(), role: None });
    let Json(board) = invite_member(State(state.clone()), acting("alice"), Path(board.id.clone()), body)
        .await
        .unwrap();
    assert_eq!(board.role_of("bob"), Some(BoardRole::Editor));

    let status = update_member(
        State(state),
        acting("alice"),
        Path((board.id.clone(), "alice".into())),
        Json(UpdateMemberBody { role: BoardRole::Viewer }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn non_member_gets_403_and_unknown_board_404() {
    let state = test_app_state();
    let (_, Json(board)) = create_board(State(state.clone()), acting("alice"), named("Roadmap"))
        .await
        .unwrap();

    let err = get_board(State(state.clone()), acting("mallory"), Path(board.id.clone()))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCode::FORBIDDEN);

    let err = get_board(State(state.clone()), acting("alice"), Path("missing".into()))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCode::NOT_FOUND);

    let err = list_presence(State(state), acting("mallory"), Path(board.id))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn short_rename_is_400_and_delete_is_204() {
    let state = test_app_state();
    let (_, Json(board)) = create_board(State(state.clone()), acting("alice"), named("Roadmap"))
        .await
        .unwrap();

    let err = rename_board(State(state.clone()), acting("alice"), Path(board.id.clone()), named("x"))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCode::BAD_REQUEST);

    let status = delete_board(State(state.clone()), acting("alice"), Path(board.id.clone()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status = remove_member(State(state), acting("alice"), Path((board.id, "bob".into())))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}
